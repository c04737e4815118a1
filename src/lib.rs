#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate actix_derive;
extern crate colored;

pub mod analysis;
pub mod audit;
pub mod dissemination;
pub mod integration_test;
pub mod message;
pub mod network;
pub mod node;
pub mod settings;
pub mod simulation;
pub mod storage;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Actix(actix::MailboxError),
    Node(node::Error),
    Dissemination(dissemination::Error),
    Storage(storage::Error),
    Settings(settings::Error),
}

impl std::error::Error for Error {}

impl std::convert::From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IO(error)
    }
}

impl std::convert::From<actix::MailboxError> for Error {
    fn from(error: actix::MailboxError) -> Self {
        Error::Actix(error)
    }
}

impl std::convert::From<node::Error> for Error {
    fn from(error: node::Error) -> Self {
        Error::Node(error)
    }
}

impl std::convert::From<dissemination::Error> for Error {
    fn from(error: dissemination::Error) -> Self {
        Error::Dissemination(error)
    }
}

impl std::convert::From<storage::Error> for Error {
    fn from(error: storage::Error) -> Self {
        Error::Storage(error)
    }
}

impl std::convert::From<settings::Error> for Error {
    fn from(error: settings::Error) -> Self {
        Error::Settings(error)
    }
}

impl std::convert::From<sled::Error> for Error {
    fn from(error: sled::Error) -> Self {
        Error::Storage(storage::Error::Sled(error))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
