//! Experiment storage layer using [`sled`](http://docs.rs/sled/) as backend
use std::path::Path;

/// Audit event trees, one per algorithm
pub mod events;
/// Experiment configurations and run summaries
pub mod experiments;
/// Run registry
pub mod runs;

#[derive(Debug)]
pub enum Error {
    Bincode(String),
    Sled(sled::Error),
    UnknownExperiment(u64),
    UnknownRun(String),
}

impl std::error::Error for Error {}

impl std::convert::From<Box<bincode::ErrorKind>> for Error {
    fn from(error: Box<bincode::ErrorKind>) -> Self {
        Error::Bincode(format!("{:?}", error))
    }
}

impl std::convert::From<sled::Error> for Error {
    fn from(error: sled::Error) -> Self {
        Error::Sled(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Handle to the experiment database. Clones share the same underlying `sled::Db`.
#[derive(Debug, Clone)]
pub struct Storage {
    db: sled::Db,
}

impl Storage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Storage { db })
    }

    /// A database which is removed once the last handle is dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Storage { db })
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Removes every stored experiment, run, summary and audit event.
    pub fn clear(&self) -> Result<()> {
        for name in self.db.tree_names() {
            // The default tree cannot be dropped, only emptied.
            if name == self.db.name() {
                self.db.clear()?;
            } else {
                let _ = self.db.drop_tree(&name)?;
            }
        }
        self.db.flush()?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        let _ = self.db.flush()?;
        Ok(())
    }
}
