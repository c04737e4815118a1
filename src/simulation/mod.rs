//! Runs dissemination strategies end to end: population, deadline, audit, summary.
mod coordinator;

pub use coordinator::*;
