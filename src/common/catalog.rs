use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    sync::{Arc, RwLock},
};

use log::info;

use crate::{
    error::{DbError, ErrorKind},
    storage::heap_table::HeapTable,
    storage::schema::{FieldItem, Schema, Type},
    types::Pod,
    utils::HandyRwLock,
};

/// The registry of tables, addressed by id or by name. Table ids come
/// from the table itself (a stable hash of its file path), so the two
/// maps never disagree.
pub struct Catalog {
    tables: RwLock<HashMap<u32, Pod<HeapTable>>>,

    // table name -> table id
    names: RwLock<HashMap<String, u32>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_table(&self, table_rc: Pod<HeapTable>, name: &str) {
        let table_id = table_rc.rl().get_id();
        self.tables.wl().insert(table_id, table_rc);
        self.names.wl().insert(name.to_string(), table_id);
    }

    pub fn get_table(&self, table_id: u32) -> Option<Pod<HeapTable>> {
        self.tables.rl().get(&table_id).cloned()
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<Pod<HeapTable>> {
        let table_id = *self.names.rl().get(name)?;
        self.get_table(table_id)
    }

    pub fn get_table_name(&self, table_id: u32) -> Option<String> {
        self.names
            .rl()
            .iter()
            .find(|(_, id)| **id == table_id)
            .map(|(name, _)| name.clone())
    }

    pub fn get_schema(&self, table_id: u32) -> Option<Schema> {
        self.get_table(table_id)
            .map(|table_rc| table_rc.rl().get_schema().clone())
    }

    pub fn table_ids(&self) -> Vec<u32> {
        self.tables.rl().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.tables.wl().clear();
        self.names.wl().clear();
    }

    /// Load table definitions from a line-oriented schema file:
    ///
    /// ```text
    /// name (fname type[, fname type[ pk]]*)
    /// ```
    ///
    /// `type` is `int` or `string`, case insensitive; a trailing `pk`
    /// marks the primary-key field. Each table is backed by
    /// `<name>.dat` next to the schema file. Returns the names of the
    /// loaded tables in file order.
    pub fn load_schema(&self, schema_file_path: &str) -> Result<Vec<String>, DbError> {
        let schema_file = File::open(schema_file_path)?;
        let reader = BufReader::new(schema_file);
        let dir = Path::new(schema_file_path)
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let mut loaded = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (name, fields, key_field) = Self::parse_line(line)?;

            let dat_path = dir.join(format!("{}.dat", name));
            let table = HeapTable::new(
                dat_path.to_str().ok_or_else(|| {
                    DbError::new(ErrorKind::Io, "table path is not valid utf-8")
                })?,
                key_field,
                &Schema::new(fields),
            );

            info!("loaded table {} with id {}", name, table.get_id());
            self.add_table(Arc::new(RwLock::new(table)), &name);
            loaded.push(name);
        }

        Ok(loaded)
    }

    fn parse_line(line: &str) -> Result<(String, Vec<FieldItem>, Option<usize>), DbError> {
        let malformed =
            || DbError::new(ErrorKind::SchemaMismatch, &format!("malformed schema line: {}", line));

        let open = line.find('(').ok_or_else(malformed)?;
        let close = line.rfind(')').ok_or_else(malformed)?;
        if close < open {
            return Err(malformed());
        }

        let name = line[..open].trim();
        if name.is_empty() {
            return Err(malformed());
        }

        let mut fields = Vec::new();
        let mut key_field = None;
        for (i, part) in line[open + 1..close].split(',').enumerate() {
            let tokens: Vec<&str> = part.split_whitespace().collect();
            let (field_name, type_name) = match tokens.as_slice() {
                [field_name, type_name] => (*field_name, *type_name),
                [field_name, type_name, pk] if pk.eq_ignore_ascii_case("pk") => {
                    key_field = Some(i);
                    (*field_name, *type_name)
                }
                _ => return Err(malformed()),
            };

            let field_type = match type_name.to_ascii_lowercase().as_str() {
                "int" => Type::Int,
                "string" => Type::String,
                _ => {
                    return Err(DbError::new(
                        ErrorKind::SchemaMismatch,
                        &format!("unknown field type: {}", type_name),
                    ))
                }
            };
            fields.push(FieldItem::new(field_name, field_type));
        }

        if fields.is_empty() {
            return Err(malformed());
        }

        Ok((name.to_string(), fields, key_field))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
