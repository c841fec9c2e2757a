use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, RwLock,
    },
};

use log::debug;

use crate::{
    common::Database,
    error::{DbError, ErrorKind},
    storage::heap_page::{HeapPage, HeapPageID},
    storage::tuple::Tuple,
    transaction::{Permission, Transaction},
    types::{DbResult, Pod, ResultPod},
    utils::HandyRwLock,
};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Default number of pages the pool may hold at once.
pub const DEFAULT_PAGES: usize = 50;

// The cache map and the access-order index are always updated together
// under one mutex; disk I/O never happens while it is held.
struct Frames {
    pages: HashMap<HeapPageID, Pod<HeapPage>>,

    // least recently used first, most recently used last
    access_order: Vec<HeapPageID>,
}

impl Frames {
    fn new() -> Self {
        Self {
            pages: HashMap::new(),
            access_order: Vec::new(),
        }
    }

    fn touch(&mut self, pid: &HeapPageID) {
        if let Some(pos) = self.access_order.iter().position(|p| p == pid) {
            self.access_order.remove(pos);
        }
        self.access_order.push(*pid);
    }

    fn remove(&mut self, pid: &HeapPageID) {
        self.pages.remove(pid);
        self.access_order.retain(|p| p != pid);
    }

    // Drop the least recently used clean page. Dirty pages never leave
    // the pool before their transaction completes (NO-STEAL), so a
    // pool full of dirty pages cannot make room.
    fn evict_one(&mut self) -> DbResult {
        let victim = self
            .access_order
            .iter()
            .find(|pid| {
                self.pages
                    .get(*pid)
                    .map(|page| page.rl().is_dirty().is_none())
                    .unwrap_or(false)
            })
            .cloned();

        match victim {
            Some(pid) => {
                debug!("evicting {}", pid);
                self.remove(&pid);
                Ok(())
            }
            None => Err(DbError::new(
                ErrorKind::NoCleanVictim,
                "every resident page is dirty",
            )),
        }
    }
}

/// The bounded page cache every page access funnels through.
///
/// `get_page` asks the lock manager for the matching lock first, so a
/// returned page is always protected by the caller's transaction.
pub struct BufferPool {
    frames: Mutex<Frames>,
    capacity: usize,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PAGES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(Frames::new()),
            capacity,
        }
    }

    pub fn set_page_size(page_size: usize) {
        PAGE_SIZE.store(page_size, Ordering::Relaxed);
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::Relaxed)
    }

    pub fn get_capacity(&self) -> usize {
        self.capacity
    }

    /// Retrieve the page with the permission's lock held. Blocks until
    /// the lock manager grants the lock; fails with `Deadlock` when
    /// blocking would close a wait-for cycle, and with `NoCleanVictim`
    /// when the pool is full of dirty pages.
    pub fn get_page(
        &self,
        tx: &Transaction,
        perm: Permission,
        pid: &HeapPageID,
    ) -> ResultPod<HeapPage> {
        Database::lock_manager().acquire_lock(tx, &perm.to_lock(), pid)?;

        // fast path: cache hit
        {
            let mut frames = self.frames.lock().unwrap();
            if let Some(page_rc) = frames.pages.get(pid) {
                let page_rc = page_rc.clone();
                frames.touch(pid);
                return Ok(page_rc);
            }
        }

        // stage 1: find the owning table
        let table_rc = Database::catalog().get_table(pid.table_id).ok_or_else(|| {
            DbError::new(
                ErrorKind::WrongTable,
                &format!("no table {} in the catalog", pid.table_id),
            )
        })?;

        // stage 2: read the page from disk, or materialize a fresh one
        // when the page sits at the end of the file
        let page = {
            let table = table_rc.rl();
            if pid.page_index < table.num_pages()? {
                table.read_page(pid)?
            } else {
                HeapPage::new(pid, &HeapPage::empty_page_data(), table.get_schema())?
            }
        };

        // stage 3: cache it
        let mut frames = self.frames.lock().unwrap();
        if let Some(page_rc) = frames.pages.get(pid) {
            // another caller loaded it while we were reading
            let page_rc = page_rc.clone();
            frames.touch(pid);
            return Ok(page_rc);
        }

        if frames.pages.len() >= self.capacity {
            frames.evict_one()?;
        }

        let page_rc = Arc::new(RwLock::new(page));
        frames.pages.insert(*pid, page_rc.clone());
        frames.touch(pid);
        Ok(page_rc)
    }

    /// Add the tuple to the table on behalf of the transaction. The
    /// dirtied page is marked with the transaction id and becomes the
    /// most recently used entry.
    pub fn insert_tuple(&self, tx: &Transaction, table_id: u32, tuple: &mut Tuple) -> DbResult {
        let table_rc = Database::catalog().get_table(table_id).ok_or_else(|| {
            DbError::new(
                ErrorKind::WrongTable,
                &format!("no table {} in the catalog", table_id),
            )
        })?;

        let dirtied = table_rc.rl().insert_tuple(tx, tuple)?;
        for pid in dirtied {
            self.mark_page_dirty(tx, &pid);
        }
        Ok(())
    }

    /// Remove the tuple named by its record id.
    pub fn delete_tuple(&self, tx: &Transaction, tuple: &Tuple) -> DbResult {
        let rid = tuple.get_rid().ok_or_else(|| {
            DbError::new(ErrorKind::NotOnThisPage, "tuple has no record id")
        })?;

        let table_rc = Database::catalog()
            .get_table(rid.pid.table_id)
            .ok_or_else(|| {
                DbError::new(
                    ErrorKind::WrongTable,
                    &format!("no table {} in the catalog", rid.pid.table_id),
                )
            })?;

        let dirtied = table_rc.rl().delete_tuple(tx, tuple)?;
        for pid in dirtied {
            self.mark_page_dirty(tx, &pid);
        }
        Ok(())
    }

    fn mark_page_dirty(&self, tx: &Transaction, pid: &HeapPageID) {
        let mut frames = self.frames.lock().unwrap();
        if let Some(page_rc) = frames.pages.get(pid) {
            page_rc.wl().mark_dirty(true, tx);
            frames.touch(pid);
        }
    }

    /// Write the page to disk if it is cached and dirty, then clear the
    /// dirty flag. A clean or absent page is a no-op.
    pub fn flush_page(&self, pid: &HeapPageID) -> DbResult {
        let page_rc = match self.frames.lock().unwrap().pages.get(pid) {
            Some(page_rc) => page_rc.clone(),
            None => return Ok(()),
        };

        let mut page = page_rc.wl();
        let dirtier = match page.is_dirty() {
            Some(tx) => tx,
            None => return Ok(()),
        };

        let table_rc = Database::catalog().get_table(pid.table_id).ok_or_else(|| {
            DbError::new(
                ErrorKind::WrongTable,
                &format!("no table {} in the catalog", pid.table_id),
            )
        })?;
        table_rc.rl().write_page(&page)?;
        page.mark_dirty(false, &dirtier);

        debug!("flushed {}", pid);
        Ok(())
    }

    pub fn flush_all_pages(&self) -> DbResult {
        let pids: Vec<HeapPageID> = self
            .frames
            .lock()
            .unwrap()
            .pages
            .keys()
            .cloned()
            .collect();
        for pid in pids {
            self.flush_page(&pid)?;
        }
        Ok(())
    }

    /// Drop the page from the cache without writing it.
    pub fn discard_page(&self, pid: &HeapPageID) {
        self.frames.lock().unwrap().remove(pid);
    }

    /// Release one lock before the transaction completes. The page
    /// leaves the held-pages index immediately; callers accept that the
    /// resulting schedule may violate two-phase locking.
    pub fn release_page(&self, tx: &Transaction, pid: &HeapPageID) {
        Database::lock_manager().release_lock(tx, pid, true);
    }

    /// Finish the transaction: flush every page it still holds (commit)
    /// or drop them from the cache so the disk image survives (abort),
    /// then release all its locks.
    pub fn tx_complete(&self, tx: &Transaction, commit: bool) -> DbResult {
        if let Some(pids) = Database::lock_manager().pages_held(tx) {
            for pid in pids {
                if commit {
                    self.flush_page(&pid)?;
                } else {
                    self.discard_page(&pid);
                }
            }
        }

        Database::lock_manager().release_all(tx);
        debug!("{} complete, commit: {}", tx, commit);
        Ok(())
    }

    pub fn is_cached(&self, pid: &HeapPageID) -> bool {
        self.frames.lock().unwrap().pages.contains_key(pid)
    }

    pub fn cached_count(&self) -> usize {
        self.frames.lock().unwrap().pages.len()
    }

    pub fn clear(&self) {
        let mut frames = self.frames.lock().unwrap();
        frames.pages.clear();
        frames.access_order.clear();
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}
