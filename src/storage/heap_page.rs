use std::{fmt, io::Cursor};

use bit_vec::BitVec;

use crate::{
    buffer_pool::BufferPool,
    error::{DbError, ErrorKind},
    storage::schema::Schema,
    storage::tuple::{RecordID, Tuple},
    transaction::Transaction,
    types::DbResult,
};

/// Identity of a page: the owning table and the page's position in the
/// table's file.
#[derive(PartialEq, Eq, Hash, Clone, Copy)]
pub struct HeapPageID {
    pub table_id: u32,
    pub page_index: usize,
}

impl HeapPageID {
    pub fn new(table_id: u32, page_index: usize) -> Self {
        Self {
            table_id,
            page_index,
        }
    }
}

impl fmt::Display for HeapPageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "table_{}_page_{}", self.table_id, self.page_index)
    }
}

impl fmt::Debug for HeapPageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A fixed-size slotted page.
///
/// On disk the page is a bitmap header of `ceil(slot_count / 8)` bytes
/// followed by `slot_count` fixed-width tuple slots, then zero padding.
/// Bit `i` of the header (LSB-first within each byte) tells whether slot
/// `i` holds a tuple.
#[derive(Debug)]
pub struct HeapPage {
    pid: HeapPageID,

    schema: Schema,

    pub slot_count: usize,

    // indicate slots' status: true means occupied, false means empty
    header: BitVec,

    // all tuples (include empty tuples)
    tuples: Vec<Tuple>,

    // the transaction that made the page differ from disk, None when
    // clean
    dirtier: Option<Transaction>,
}

impl HeapPage {
    pub fn new(pid: &HeapPageID, bytes: &[u8], schema: &Schema) -> Result<Self, DbError> {
        let page_size = BufferPool::get_page_size();
        if bytes.len() != page_size {
            return Err(DbError::new(
                ErrorKind::Io,
                &format!("page buffer is {} bytes, want {}", bytes.len(), page_size),
            ));
        }

        let slot_count = Self::get_max_slots(schema);
        let header_size = Self::get_header_size(slot_count);
        let header = Self::parse_header(&bytes[..header_size]);

        let tuple_size = schema.get_size();
        let mut tuples = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            let start = header_size + i * tuple_size;
            let mut reader = Cursor::new(&bytes[start..start + tuple_size]);
            let mut tuple = Tuple::read_from(&mut reader, schema)?;
            if header[i] {
                tuple.set_rid(Some(RecordID::new(*pid, i)));
            }
            tuples.push(tuple);
        }

        Ok(Self {
            pid: *pid,
            schema: schema.clone(),
            slot_count,
            header,
            tuples,
            dirtier: None,
        })
    }

    pub fn empty_page_data() -> Vec<u8> {
        vec![0; BufferPool::get_page_size()]
    }

    /// Retrieve the maximum number of tuples this page can hold: each
    /// tuple costs its own bytes plus one header bit.
    pub fn get_max_slots(schema: &Schema) -> usize {
        let bits_per_tuple_including_header = schema.get_size() * 8 + 1;
        BufferPool::get_page_size() * 8 / bits_per_tuple_including_header
    }

    pub fn get_header_size(slot_count: usize) -> usize {
        (slot_count + 7) / 8
    }

    // The header bits are numbered LSB-first within each byte, matching
    // the on-disk layout. `BitVec::from_bytes` is MSB-first, so decode
    // by hand.
    fn parse_header(bytes: &[u8]) -> BitVec {
        let mut header = BitVec::with_capacity(bytes.len() * 8);
        for byte in bytes {
            for i in 0..8 {
                header.push(byte >> i & 1 == 1);
            }
        }
        header
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_slot_used(&self, slot_index: usize) -> bool {
        self.header[slot_index]
    }

    fn mark_slot_status(&mut self, slot_index: usize, used: bool) {
        self.header.set(slot_index, used);
    }

    pub fn empty_slots_count(&self) -> usize {
        (0..self.slot_count)
            .filter(|&i| !self.is_slot_used(i))
            .count()
    }

    /// Returns the number of tuples currently stored on this page.
    pub fn tuples_count(&self) -> usize {
        self.slot_count - self.empty_slots_count()
    }

    pub fn get_tuple(&self, slot_index: usize) -> Result<Tuple, DbError> {
        if slot_index >= self.slot_count || !self.is_slot_used(slot_index) {
            return Err(DbError::new(
                ErrorKind::SlotEmpty,
                &format!("no tuple in slot {} of {}", slot_index, self.pid),
            ));
        }
        Ok(self.tuples[slot_index].clone())
    }

    /// Place the tuple in the lowest-indexed empty slot and stamp its
    /// record id with it.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> DbResult {
        if !tuple.matches_schema(&self.schema) {
            return Err(DbError::new(
                ErrorKind::SchemaMismatch,
                &format!("tuple {} does not fit the schema of {}", tuple, self.pid),
            ));
        }

        for i in 0..self.slot_count {
            if !self.is_slot_used(i) {
                tuple.set_rid(Some(RecordID::new(self.pid, i)));
                self.tuples[i] = tuple.clone();
                self.mark_slot_status(i, true);
                return Ok(());
            }
        }

        Err(DbError::new(
            ErrorKind::PageFull,
            &format!("no empty slot in {}", self.pid),
        ))
    }

    pub fn delete_tuple(&mut self, tuple: &Tuple) -> DbResult {
        let rid = tuple.get_rid().ok_or_else(|| {
            DbError::new(ErrorKind::NotOnThisPage, "tuple has no record id")
        })?;

        if rid.pid != self.pid {
            return Err(DbError::new(
                ErrorKind::NotOnThisPage,
                &format!("tuple lives on {}, not {}", rid.pid, self.pid),
            ));
        }
        if !self.is_slot_used(rid.slot) {
            return Err(DbError::new(
                ErrorKind::SlotAlreadyEmpty,
                &format!("slot {} of {} is already empty", rid.slot, self.pid),
            ));
        }

        self.mark_slot_status(rid.slot, false);
        Ok(())
    }

    pub fn mark_dirty(&mut self, dirty: bool, tx: &Transaction) {
        if dirty {
            self.dirtier = Some(*tx);
        } else {
            self.dirtier = None;
        }
    }

    /// The transaction that dirtied this page, None when the page
    /// matches disk.
    pub fn is_dirty(&self) -> Option<Transaction> {
        self.dirtier
    }

    /// Rebuild the on-disk image of this page, bit for bit.
    pub fn get_page_data(&self) -> Vec<u8> {
        let page_size = BufferPool::get_page_size();
        let header_size = Self::get_header_size(self.slot_count);
        let tuple_size = self.schema.get_size();

        let mut data = vec![0u8; header_size];
        for i in 0..self.slot_count {
            if self.is_slot_used(i) {
                data[i / 8] |= 1 << (i % 8);
            }
        }

        for i in 0..self.slot_count {
            if self.is_slot_used(i) {
                data.extend(self.tuples[i].to_bytes());
            } else {
                data.extend(vec![0u8; tuple_size]);
            }
        }

        data.resize(page_size, 0);
        data
    }

    pub fn iter(&self) -> HeapPageIterator {
        HeapPageIterator {
            page: self,
            cursor: 0,
        }
    }
}

impl fmt::Display for HeapPage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<HeapPage {}, {}/{} slots used>",
            self.pid,
            self.tuples_count(),
            self.slot_count
        )
    }
}

/// Yields the occupied tuples in ascending slot order.
pub struct HeapPageIterator<'a> {
    page: &'a HeapPage,
    cursor: usize,
}

impl<'a> Iterator for HeapPageIterator<'a> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.page.slot_count {
            let i = self.cursor;
            self.cursor += 1;
            if self.page.is_slot_used(i) {
                return Some(self.page.tuples[i].clone());
            }
        }
        None
    }
}
