use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    fs::{File, OpenOptions},
    hash::{Hash, Hasher},
    io::{Read, Seek, SeekFrom, Write},
    sync::{Mutex, MutexGuard},
};

use log::debug;

use crate::{
    buffer_pool::BufferPool,
    common::Database,
    error::{DbError, ErrorKind},
    storage::heap_page::{HeapPage, HeapPageID},
    storage::schema::Schema,
    storage::tuple::Tuple,
    transaction::{Permission, Transaction},
    utils::HandyRwLock,
};

/// A table stored as a sequence of fixed-size pages in one file on
/// disk.
///
/// All page traffic goes through the buffer pool; the only direct file
/// access is the page I/O the buffer pool itself asks for.
pub struct HeapTable {
    file_path: String,

    // the field the table is keyed on, if the schema declared one
    pub key_field: Option<usize>,

    // the tuple descriptor of rows in the file
    pub schema: Schema,

    file: Mutex<File>,

    table_id: u32,
}

impl HeapTable {
    pub fn new(file_path: &str, key_field: Option<usize>, schema: &Schema) -> Self {
        let f = Mutex::new(
            OpenOptions::new()
                .write(true)
                .read(true)
                .create(true)
                .open(file_path)
                .expect("io error"),
        );

        // The table id must be stable for the lifetime of the process,
        // so it is derived from the file path alone.
        let mut hasher = DefaultHasher::new();
        file_path.hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        Self {
            file_path: file_path.to_string(),
            key_field,
            schema: schema.clone(),
            file: f,
            table_id,
        }
    }

    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    fn get_file(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap()
    }

    fn pages_in(file: &File) -> Result<usize, DbError> {
        let len = file.metadata()?.len() as usize;
        let page_size = BufferPool::get_page_size();
        Ok((len + page_size - 1) / page_size)
    }

    /// Number of pages currently in the file.
    pub fn num_pages(&self) -> Result<usize, DbError> {
        Self::pages_in(&self.get_file())
    }

    /// Read one page straight from disk. Only the buffer pool should
    /// call this.
    pub fn read_page(&self, pid: &HeapPageID) -> Result<HeapPage, DbError> {
        if pid.table_id != self.table_id {
            return Err(DbError::new(
                ErrorKind::WrongTable,
                &format!("{} does not belong to table {}", pid, self.table_id),
            ));
        }

        let mut file = self.get_file();
        let pages = Self::pages_in(&file)?;
        if pid.page_index >= pages {
            return Err(DbError::new(
                ErrorKind::PageOutOfBounds,
                &format!("{} is out of bounds, file has {} pages", pid, pages),
            ));
        }

        let page_size = BufferPool::get_page_size();
        file.seek(SeekFrom::Start((pid.page_index * page_size) as u64))?;
        let mut buf = vec![0u8; page_size];
        file.read_exact(&mut buf)?;

        HeapPage::new(pid, &buf, &self.schema)
    }

    /// Write the page at its offset, extending the file when the page
    /// is one past the current end.
    pub fn write_page(&self, page: &HeapPage) -> Result<(), DbError> {
        let pid = page.get_pid();
        let page_size = BufferPool::get_page_size();

        let mut file = self.get_file();
        file.seek(SeekFrom::Start((pid.page_index * page_size) as u64))?;
        file.write_all(&page.get_page_data())?;
        file.flush()?;
        Ok(())
    }

    // Extend the file by one zeroed page and return its id. The file
    // mutex is the coarse allocation lock: two inserts can never claim
    // the same page number.
    fn allocate_page(&self) -> Result<HeapPageID, DbError> {
        let mut file = self.get_file();
        let page_index = Self::pages_in(&file)?;
        let page_size = BufferPool::get_page_size();

        file.seek(SeekFrom::Start((page_index * page_size) as u64))?;
        file.write_all(&HeapPage::empty_page_data())?;
        file.flush()?;

        debug!("table {} extended to page {}", self.table_id, page_index);
        Ok(HeapPageID::new(self.table_id, page_index))
    }

    /// Insert the tuple into the first page with an empty slot, scanning
    /// pages in ascending order; extend the file when every page is
    /// full. Returns the ids of the pages the insert dirtied (exactly
    /// one).
    pub fn insert_tuple(
        &self,
        tx: &Transaction,
        tuple: &mut Tuple,
    ) -> Result<Vec<HeapPageID>, DbError> {
        for page_index in 0..self.num_pages()? {
            let pid = HeapPageID::new(self.table_id, page_index);
            let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadWrite, &pid)?;

            let mut page = page_rc.wl();
            match page.insert_tuple(tuple) {
                Ok(()) => {
                    page.mark_dirty(true, tx);
                    return Ok(vec![pid]);
                }
                Err(e) if e.kind() == ErrorKind::PageFull => continue,
                Err(e) => return Err(e),
            }
        }

        // every existing page is full
        let pid = self.allocate_page()?;
        let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadWrite, &pid)?;

        let mut page = page_rc.wl();
        page.insert_tuple(tuple)?;
        page.mark_dirty(true, tx);
        Ok(vec![pid])
    }

    /// Remove the tuple named by its record id. Returns the ids of the
    /// pages the delete dirtied (exactly one).
    pub fn delete_tuple(
        &self,
        tx: &Transaction,
        tuple: &Tuple,
    ) -> Result<Vec<HeapPageID>, DbError> {
        let rid = tuple.get_rid().ok_or_else(|| {
            DbError::new(ErrorKind::NotOnThisPage, "tuple has no record id")
        })?;
        if rid.pid.table_id != self.table_id {
            return Err(DbError::new(
                ErrorKind::WrongTable,
                &format!("{} does not belong to table {}", rid.pid, self.table_id),
            ));
        }

        let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadWrite, &rid.pid)?;

        let mut page = page_rc.wl();
        page.delete_tuple(tuple)?;
        page.mark_dirty(true, tx);
        Ok(vec![rid.pid])
    }

    /// A lazy scan over every tuple of the table, in ascending page and
    /// slot order. Pages are fetched through the buffer pool under a
    /// shared lock.
    pub fn iter(&self, tx: &Transaction) -> HeapTableIterator {
        HeapTableIterator::new(tx, self.table_id)
    }
}

impl fmt::Display for HeapTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<HeapTable, file: {}, id: {}>", self.file_path, self.table_id)
    }
}

pub struct HeapTableIterator {
    tx: Transaction,
    table_id: u32,

    page_index: usize,
    tuples: Vec<Tuple>,
    cursor: usize,
    started: bool,
}

impl HeapTableIterator {
    pub fn new(tx: &Transaction, table_id: u32) -> Self {
        Self {
            tx: *tx,
            table_id,
            page_index: 0,
            tuples: Vec::new(),
            cursor: 0,
            started: false,
        }
    }

    pub fn rewind(&mut self) {
        self.page_index = 0;
        self.tuples.clear();
        self.cursor = 0;
        self.started = false;
    }

    fn table_pages(&self) -> usize {
        let table_rc = Database::catalog()
            .get_table(self.table_id)
            .expect("table vanished from the catalog");
        let pages = table_rc.rl().num_pages().expect("io error");
        pages
    }

    fn load_page(&mut self, page_index: usize) {
        let pid = HeapPageID::new(self.table_id, page_index);
        let page_rc = Database::buffer_pool()
            .get_page(&self.tx, Permission::ReadOnly, &pid)
            .expect("scan failed to fetch a page");

        let page = page_rc.rl();
        self.tuples = page.iter().collect();
        self.page_index = page_index;
        self.cursor = 0;
    }
}

impl Iterator for HeapTableIterator {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if !self.started {
                if self.table_pages() == 0 {
                    return None;
                }
                self.load_page(0);
                self.started = true;
            }

            if self.cursor < self.tuples.len() {
                let tuple = self.tuples[self.cursor].clone();
                self.cursor += 1;
                return Some(tuple);
            }

            if self.page_index + 1 < self.table_pages() {
                let next_index = self.page_index + 1;
                self.load_page(next_index);
            } else {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc, sync::RwLock};

    use super::*;
    use crate::{
        storage::schema::small_int_schema, storage::tuple::Cell, utils::init_log,
    };

    fn fresh_table(file_name: &str) -> HeapTable {
        let path = std::env::temp_dir().join(file_name);
        let _ = fs::remove_file(&path);
        HeapTable::new(path.to_str().unwrap(), None, &small_int_schema(2, ""))
    }

    #[test]
    fn test_num_pages_tracks_file_length() {
        init_log();
        let table = fresh_table("table_num_pages.dat");
        assert_eq!(table.num_pages().unwrap(), 0);

        let schema = table.get_schema().clone();
        for i in 0..3 {
            let pid = HeapPageID::new(table.get_id(), i);
            let page = HeapPage::new(&pid, &HeapPage::empty_page_data(), &schema).unwrap();
            table.write_page(&page).unwrap();
            assert_eq!(table.num_pages().unwrap(), i + 1);
        }
    }

    #[test]
    fn test_read_page_round_trip() {
        let table = fresh_table("table_read_page.dat");
        let pid = HeapPageID::new(table.get_id(), 0);
        let schema = table.get_schema().clone();

        let mut page = HeapPage::new(&pid, &HeapPage::empty_page_data(), &schema).unwrap();
        let mut tuple = Tuple::new_int_tuples(11, 2);
        page.insert_tuple(&mut tuple).unwrap();
        table.write_page(&page).unwrap();

        let read_back = table.read_page(&pid).unwrap();
        assert_eq!(read_back.tuples_count(), 1);
        assert_eq!(read_back.get_tuple(0).unwrap(), tuple);
    }

    #[test]
    fn test_read_page_errors() {
        use crate::error::ErrorKind;

        let table = fresh_table("table_read_errors.dat");

        let foreign = HeapPageID::new(table.get_id().wrapping_add(1), 0);
        assert_eq!(
            table.read_page(&foreign).unwrap_err().kind(),
            ErrorKind::WrongTable
        );

        let past_end = HeapPageID::new(table.get_id(), 0);
        assert_eq!(
            table.read_page(&past_end).unwrap_err().kind(),
            ErrorKind::PageOutOfBounds
        );
    }

    #[test]
    fn test_insert_and_iterate_through_buffer_pool() {
        init_log();
        let table_rc = Arc::new(RwLock::new(fresh_table("table_iter.dat")));
        Database::catalog().add_table(table_rc.clone(), "table_iter");

        let tx = Transaction::new();
        let table = table_rc.rl();
        for i in 0..5 {
            let mut tuple = Tuple::new_int_tuples(i, 2);
            let dirtied = table.insert_tuple(&tx, &mut tuple).unwrap();
            assert_eq!(dirtied, vec![HeapPageID::new(table.get_id(), 0)]);
            assert_eq!(tuple.get_rid().unwrap().slot, i as usize);
        }

        let scanned: Vec<Tuple> = table.iter(&tx).collect();
        assert_eq!(scanned.len(), 5);
        for (i, tuple) in scanned.iter().enumerate() {
            assert_eq!(tuple.get_cell(0), Cell::Int32(i as i32));
        }
        drop(table);
        tx.commit().unwrap();
    }
}
