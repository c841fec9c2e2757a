use std::{error::Error, fmt};

use backtrace::Backtrace;
use log::error;

/// What went wrong, for callers that need to branch on the failure
/// (the core retries nothing, but tests and operators do branch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Page number is at or past the end of the file.
    PageOutOfBounds,
    /// Operation targets a page id of another table.
    WrongTable,
    /// Tuple layout differs from the page/table schema.
    SchemaMismatch,
    /// Insert on a page with no empty slot.
    PageFull,
    /// Delete of a tuple whose record id names another page.
    NotOnThisPage,
    /// Delete of a slot that is already empty.
    SlotAlreadyEmpty,
    /// Read of a slot that holds no tuple.
    SlotEmpty,
    /// Eviction requested while every resident page is dirty.
    NoCleanVictim,
    /// Granting the lock would close a cycle in the wait-for graph.
    Deadlock,
    /// Underlying disk I/O failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug)]
pub struct DbError {
    kind: ErrorKind,
    details: String,
}

impl DbError {
    pub fn new(kind: ErrorKind, msg: &str) -> DbError {
        DbError {
            kind,
            details: msg.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn show_backtrace(&self) {
        error!("{}\n{:?}", self, Backtrace::new());
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.details)
    }
}

impl Error for DbError {}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::new(ErrorKind::Io, &e.to_string())
    }
}
