use crate::{
    common::Database,
    error::DbError,
    executor::OpIterator,
    storage::tuple::{Cell, Tuple},
    transaction::Transaction,
};

/// Drains the child and inserts every tuple into the table. Returns the
/// one-field tuple holding the number of inserted rows; running it
/// again inserts (and reports) nothing.
pub struct Insert<C: OpIterator> {
    tx: Transaction,
    table_id: u32,
    child: C,
}

impl<C: OpIterator> Insert<C> {
    pub fn new(tx: &Transaction, table_id: u32, child: C) -> Self {
        Self {
            tx: *tx,
            table_id,
            child,
        }
    }

    pub fn execute(&mut self) -> Result<Tuple, DbError> {
        let mut count = 0;
        while let Some(mut tuple) = self.child.next() {
            Database::buffer_pool().insert_tuple(&self.tx, self.table_id, &mut tuple)?;
            count += 1;
        }
        Ok(Tuple::new(&[Cell::Int32(count)]))
    }
}
