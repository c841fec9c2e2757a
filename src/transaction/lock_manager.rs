use std::{
    collections::{HashMap, HashSet},
    sync::{Condvar, Mutex},
};

use log::debug;

use crate::{
    error::{DbError, ErrorKind},
    storage::heap_page::HeapPageID,
    transaction::Transaction,
    types::DbResult,
};

use super::wait_for_graph::WaitForGraph;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Lock {
    SLock,
    XLock,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::SLock,
            Permission::ReadWrite => Lock::XLock,
        }
    }
}

/// Lock state of one page. An exclusive holder is always the sole
/// holder, so the holder set plus the two counters describe every legal
/// state.
struct LockRecord {
    holders: HashSet<u64>,
    shared_count: usize,
    exclusive_count: usize,

    // requests that are currently blocked on this page
    waiters: HashMap<u64, Lock>,
}

impl LockRecord {
    fn new() -> Self {
        Self {
            holders: HashSet::new(),
            shared_count: 0,
            exclusive_count: 0,
            waiters: HashMap::new(),
        }
    }

    fn is_sole_holder(&self, tid: u64) -> bool {
        self.holders.len() == 1 && self.holders.contains(&tid)
    }
}

// All bookkeeping lives under one mutex; waiters sleep on the condvar
// and recheck their own grant condition on every broadcast.
struct LockTables {
    page_locks: HashMap<HeapPageID, LockRecord>,
    trans_pages: HashMap<u64, HashSet<HeapPageID>>,
    wait_for: WaitForGraph,
}

impl LockTables {
    fn new() -> Self {
        Self {
            page_locks: HashMap::new(),
            trans_pages: HashMap::new(),
            wait_for: WaitForGraph::new(),
        }
    }

    // Grant the request if the compatibility rules allow it right now.
    // Re-entrant requests succeed without changing anything.
    fn try_grant(&mut self, tid: u64, lock: &Lock, pid: &HeapPageID) -> bool {
        let record = self
            .page_locks
            .entry(*pid)
            .or_insert_with(LockRecord::new);

        let granted = match lock {
            Lock::SLock => {
                if record.holders.contains(&tid) {
                    // already holds shared or exclusive, both satisfy a
                    // read
                    true
                } else if record.exclusive_count == 0 {
                    record.holders.insert(tid);
                    record.shared_count += 1;
                    true
                } else {
                    false
                }
            }
            Lock::XLock => {
                if record.holders.is_empty() {
                    record.holders.insert(tid);
                    record.exclusive_count = 1;
                    true
                } else if record.is_sole_holder(tid) {
                    if record.exclusive_count == 0 {
                        // upgrade: the shared slot is retained right up
                        // to this point
                        record.shared_count -= 1;
                        record.exclusive_count = 1;
                    }
                    true
                } else {
                    false
                }
            }
        };

        if granted {
            record.waiters.remove(&tid);
            self.trans_pages
                .entry(tid)
                .or_insert_with(HashSet::new)
                .insert(*pid);
        }
        granted
    }

    fn release(&mut self, tid: u64, pid: &HeapPageID, remove_from_index: bool) {
        if let Some(record) = self.page_locks.get_mut(pid) {
            if record.holders.remove(&tid) {
                if record.exclusive_count == 1 {
                    record.exclusive_count = 0;
                } else {
                    record.shared_count -= 1;
                }
            }
        }

        if remove_from_index {
            if let Some(pages) = self.trans_pages.get_mut(&tid) {
                pages.remove(pid);
            }
        }
    }
}

/// Per-page shared/exclusive locks with wait-for-graph deadlock
/// detection.
///
/// `acquire_lock` is the single suspension point of the whole engine:
/// it blocks until the request is compatible, or fails with `Deadlock`
/// when blocking would close a cycle. The caller is expected to abort
/// the transaction on `Deadlock`; the lock manager never aborts
/// anything itself.
pub struct LockManager {
    tables: Mutex<LockTables>,
    wakeup: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(LockTables::new()),
            wakeup: Condvar::new(),
        }
    }

    pub fn acquire_lock(&self, tx: &Transaction, lock: &Lock, pid: &HeapPageID) -> DbResult {
        let tid = tx.get_id();
        let mut tables = self.tables.lock().unwrap();

        loop {
            if tables.try_grant(tid, lock, pid) {
                debug!("{} granted {:?} on {}", tx, lock, pid);
                return Ok(());
            }

            // About to block: point a wait-for edge at every current
            // holder, then make sure the new edges close no cycle.
            let holders: Vec<u64> = tables
                .page_locks
                .get(pid)
                .map(|r| r.holders.iter().cloned().filter(|h| *h != tid).collect())
                .unwrap_or_default();
            for &holder in &holders {
                tables.wait_for.add_edge(tid, holder);
            }

            if tables.wait_for.has_cycle_from(tid) {
                tables.wait_for.remove_waiter(tid);
                if let Some(record) = tables.page_locks.get_mut(pid) {
                    record.waiters.remove(&tid);
                }

                let err = DbError::new(
                    ErrorKind::Deadlock,
                    &format!("{} waiting for {:?} on {} would deadlock", tx, lock, pid),
                );
                err.show_backtrace();
                return Err(err);
            }

            if let Some(record) = tables.page_locks.get_mut(pid) {
                record.waiters.insert(tid, *lock);
            }

            tables = self.wakeup.wait(tables).unwrap();

            // holders may have changed while we slept; the edges get
            // rebuilt on the next round
            tables.wait_for.remove_waiter(tid);
        }
    }

    /// Drop one lock and wake every waiter so each can recheck its own
    /// grant condition. When `remove_from_index` is set the page also
    /// leaves the transaction's held-pages index (early release;
    /// callers accept that this breaks two-phase locking).
    pub fn release_lock(&self, tx: &Transaction, pid: &HeapPageID, remove_from_index: bool) {
        let mut tables = self.tables.lock().unwrap();
        tables.release(tx.get_id(), pid, remove_from_index);
        self.wakeup.notify_all();
    }

    /// Release every lock the transaction holds; the strict two-phase
    /// shrink at commit or abort.
    pub fn release_all(&self, tx: &Transaction) {
        let tid = tx.get_id();
        let mut tables = self.tables.lock().unwrap();

        if let Some(pages) = tables.trans_pages.remove(&tid) {
            for pid in pages {
                tables.release(tid, &pid, false);
            }
        }

        tables.wait_for.remove_waiter(tid);
        for record in tables.page_locks.values_mut() {
            record.waiters.remove(&tid);
        }

        debug!("{} released all locks", tx);
        self.wakeup.notify_all();
    }

    pub fn holds_lock(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        let tables = self.tables.lock().unwrap();
        tables
            .trans_pages
            .get(&tx.get_id())
            .map_or(false, |pages| pages.contains(pid))
    }

    pub fn pages_held(&self, tx: &Transaction) -> Option<HashSet<HeapPageID>> {
        let tables = self.tables.lock().unwrap();
        tables.trans_pages.get(&tx.get_id()).cloned()
    }
}
