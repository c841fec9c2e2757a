use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{common::Database, types::DbResult};

static TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// A transaction handle. The id increases monotonically by 1 and is the
/// only identity the lock manager and buffer pool ever see.
#[derive(Eq, Hash, PartialEq, Clone, Copy)]
pub struct Transaction {
    uuid: u64,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            uuid: TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn get_id(&self) -> u64 {
        self.uuid
    }

    pub fn commit(&self) -> DbResult {
        self.complete(true)
    }

    pub fn abort(&self) -> DbResult {
        self.complete(false)
    }

    fn complete(&self, commit: bool) -> DbResult {
        Database::buffer_pool().tx_complete(self, commit)
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.uuid)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
