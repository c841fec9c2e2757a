use crate::{
    common::Database,
    error::DbError,
    executor::OpIterator,
    storage::tuple::{Cell, Tuple},
    transaction::Transaction,
};

/// Drains the child and deletes every tuple it yields, by record id.
/// Returns the one-field tuple holding the number of deleted rows.
pub struct Delete<C: OpIterator> {
    tx: Transaction,
    child: C,
}

impl<C: OpIterator> Delete<C> {
    pub fn new(tx: &Transaction, child: C) -> Self {
        Self { tx: *tx, child }
    }

    pub fn execute(&mut self) -> Result<Tuple, DbError> {
        let mut count = 0;
        while let Some(tuple) = self.child.next() {
            Database::buffer_pool().delete_tuple(&self.tx, &tuple)?;
            count += 1;
        }
        Ok(Tuple::new(&[Cell::Int32(count)]))
    }
}
