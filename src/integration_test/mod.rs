#![cfg(test)]
// Suppress 'unused' warnings for the testsuite
#![allow(unused)]

mod test_utils;
