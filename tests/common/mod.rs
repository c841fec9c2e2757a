#![allow(dead_code)]

use std::{
    fs,
    path::PathBuf,
    sync::{Arc, RwLock},
};

use heap_db::{
    storage::heap_table::HeapTable,
    storage::schema::{FieldItem, Schema, Type},
    storage::tuple::{Cell, Tuple},
    types::Pod,
    utils, Database,
};

pub fn setup() {
    utils::init_log();
}

pub fn int_string_schema() -> Schema {
    Schema::new(vec![
        FieldItem::new("a", Type::Int),
        FieldItem::new("b", Type::String),
    ])
}

pub fn int_string_tuple(n: i32, s: &str) -> Tuple {
    Tuple::new(&[Cell::Int32(n), Cell::String(s.to_string())])
}

pub fn table_path(file_name: &str) -> PathBuf {
    std::env::temp_dir().join(file_name)
}

/// Create an empty table backed by a fresh file under the system temp
/// directory and register it in the global catalog.
pub fn new_empty_table(file_name: &str, schema: &Schema) -> Pod<HeapTable> {
    let path = table_path(file_name);
    let _ = fs::remove_file(&path);

    let table_rc = Arc::new(RwLock::new(HeapTable::new(
        path.to_str().unwrap(),
        None,
        schema,
    )));
    Database::catalog().add_table(table_rc.clone(), file_name);
    table_rc
}
