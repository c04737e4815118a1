//! Simulated nodes. Each node is an actor serializing every change to its knowledge;
//! a [`Population`] owns all nodes of one run and a [`Topology`] says who talks to whom.
mod node;
mod population;
mod topology;

pub use node::*;
pub use population::*;
pub use topology::*;

use crate::message::NodeId;

#[derive(Debug)]
pub enum Error {
    Actix(actix::MailboxError),
    UnknownNode(NodeId),
    /// Multicast needs at least two domains.
    InvalidDomainCount(usize),
    /// More domains than nodes to lead them.
    InsufficientNodes { domains: usize, nodes: usize },
}

impl std::error::Error for Error {}

impl std::convert::From<actix::MailboxError> for Error {
    fn from(error: actix::MailboxError) -> Self {
        Error::Actix(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
