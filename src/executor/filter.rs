use crate::{
    executor::OpIterator, predicate::Predicate, storage::schema::Schema, storage::tuple::Tuple,
};

/// Passes through the child's tuples that satisfy the predicate.
pub struct Filter<C: OpIterator> {
    predicate: Predicate,
    child: C,
}

impl<C: OpIterator> Filter<C> {
    pub fn new(predicate: Predicate, child: C) -> Self {
        Self { predicate, child }
    }
}

impl<C: OpIterator> Iterator for Filter<C> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(tuple) = self.child.next() {
            if self.predicate.matches(&tuple) {
                return Some(tuple);
            }
        }
        None
    }
}

impl<C: OpIterator> OpIterator for Filter<C> {
    fn rewind(&mut self) {
        self.child.rewind();
    }

    fn get_schema(&self) -> Schema {
        self.child.get_schema()
    }
}
