use crate::{
    common::Database,
    executor::OpIterator,
    storage::heap_table::HeapTableIterator,
    storage::schema::Schema,
    storage::tuple::Tuple,
    transaction::Transaction,
};

/// Sequential scan over one table, in page then slot order. Pages are
/// pulled through the buffer pool under a shared lock, one page at a
/// time.
pub struct SeqScan {
    pub table_id: u32,
    pub table_alias: String,

    schema: Schema,
    iter: HeapTableIterator,
}

impl SeqScan {
    pub fn new(tx: &Transaction, table_id: u32, table_alias: &str) -> Self {
        let schema = Database::catalog()
            .get_schema(table_id)
            .expect("scanned table is not in the catalog");

        Self {
            table_id,
            table_alias: table_alias.to_string(),
            schema,
            iter: HeapTableIterator::new(tx, table_id),
        }
    }
}

impl Iterator for SeqScan {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

impl OpIterator for SeqScan {
    fn rewind(&mut self) {
        self.iter.rewind();
    }

    fn get_schema(&self) -> Schema {
        self.schema.clone()
    }
}
