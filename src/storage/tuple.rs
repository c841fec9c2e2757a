use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    io::{Cursor, Read},
};

use crate::{
    error::{DbError, ErrorKind},
    storage::heap_page::HeapPageID,
    storage::schema::{Schema, Type, STRING_LEN},
};

/// A single field value.
#[derive(Debug, Clone)]
pub enum Cell {
    Int32(i32),
    String(String),
}

impl Cell {
    pub fn get_type(&self) -> Type {
        match self {
            Cell::Int32(_) => Type::Int,
            Cell::String(_) => Type::String,
        }
    }

    pub fn get_int32(&self) -> Result<i32, DbError> {
        match self {
            Cell::Int32(v) => Ok(*v),
            _ => Err(DbError::new(ErrorKind::SchemaMismatch, "not an int cell")),
        }
    }

    pub fn get_string(&self) -> Result<String, DbError> {
        match self {
            Cell::String(v) => Ok(v.clone()),
            _ => Err(DbError::new(
                ErrorKind::SchemaMismatch,
                "not a string cell",
            )),
        }
    }

    /// Decode one cell of the given type. Integers are little-endian;
    /// strings are a 4-byte little-endian length followed by exactly
    /// `STRING_LEN` bytes (zero padded).
    pub fn read_from<R: Read>(reader: &mut R, t: Type) -> Result<Cell, DbError> {
        match t {
            Type::Int => {
                let mut buf = [0u8; 4];
                reader.read_exact(&mut buf)?;
                Ok(Cell::Int32(i32::from_le_bytes(buf)))
            }
            Type::String => {
                let mut len_buf = [0u8; 4];
                reader.read_exact(&mut len_buf)?;
                let len = u32::from_le_bytes(len_buf) as usize;

                let mut buf = vec![0u8; STRING_LEN];
                reader.read_exact(&mut buf)?;
                buf.truncate(len.min(STRING_LEN));
                let v = String::from_utf8(buf)
                    .map_err(|e| DbError::new(ErrorKind::Io, &e.to_string()))?;
                Ok(Cell::String(v))
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Cell::Int32(v) => v.to_le_bytes().to_vec(),
            Cell::String(v) => {
                let str_bytes = v.as_bytes();
                let copy_len = str_bytes.len().min(STRING_LEN);

                let mut bytes = vec![0u8; 4 + STRING_LEN];
                bytes[0..4].copy_from_slice(&(copy_len as u32).to_le_bytes());
                bytes[4..4 + copy_len].copy_from_slice(&str_bytes[..copy_len]);
                bytes
            }
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Int32(a), Cell::Int32(b)) => a == b,
            (Cell::String(a), Cell::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Cell::Int32(a), Cell::Int32(b)) => a.partial_cmp(b),
            (Cell::String(a), Cell::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Cell::Int32(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            Cell::String(v) => {
                1u8.hash(state);
                v.hash(state);
            }
        }
    }
}

/// The (page, slot) coordinate a tuple got when it was materialized on a
/// page.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct RecordID {
    pub pid: HeapPageID,
    pub slot: usize,
}

impl RecordID {
    pub fn new(pid: HeapPageID, slot: usize) -> Self {
        RecordID { pid, slot }
    }
}

pub struct Tuple {
    cells: Vec<Cell>,
    rid: Option<RecordID>,
}

// constructors
impl Tuple {
    pub fn new(cells: &[Cell]) -> Self {
        Self {
            cells: cells.to_vec(),
            rid: None,
        }
    }

    pub fn read_from<R: Read>(reader: &mut R, schema: &Schema) -> Result<Self, DbError> {
        let mut cells: Vec<Cell> = Vec::new();
        for field in &schema.fields {
            cells.push(Cell::read_from(reader, field.field_type)?);
        }
        Ok(Tuple { cells, rid: None })
    }

    pub fn from_bytes(bytes: &[u8], schema: &Schema) -> Result<Self, DbError> {
        let mut reader = Cursor::new(bytes);
        Self::read_from(&mut reader, schema)
    }

    pub fn new_int_tuples(value: i32, width: usize) -> Self {
        let cells = vec![Cell::Int32(value); width];
        Tuple { cells, rid: None }
    }
}

impl Tuple {
    pub fn get_cell(&self, i: usize) -> Cell {
        self.cells[i].clone()
    }

    pub fn get_cells(&self) -> Vec<Cell> {
        self.cells.clone()
    }

    pub fn set_cell(&mut self, i: usize, c: Cell) {
        self.cells[i] = c;
    }

    pub fn cells_count(&self) -> usize {
        self.cells.len()
    }

    pub fn get_rid(&self) -> Option<RecordID> {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Option<RecordID>) {
        self.rid = rid;
    }

    /// True when the cells line up with the schema's field types one by
    /// one.
    pub fn matches_schema(&self, schema: &Schema) -> bool {
        self.cells.len() == schema.fields.len()
            && self
                .cells
                .iter()
                .zip(&schema.fields)
                .all(|(c, f)| c.get_type() == f.field_type)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for cell in &self.cells {
            bytes.append(&mut cell.to_bytes());
        }
        bytes
    }
}

impl Clone for Tuple {
    fn clone(&self) -> Tuple {
        Tuple {
            cells: self.cells.clone(),
            rid: self.rid,
        }
    }
}

/// Record ids never participate; two tuples are equal when their cells
/// are.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut content: String = "{".to_owned();
        for cell in &self.cells {
            content.push_str(&format!("{:?}, ", cell));
        }
        if !self.cells.is_empty() {
            content.truncate(content.len() - 2);
        }
        content.push('}');
        write!(f, "{}", content)
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
