use crate::{
    executor::OpIterator, predicate::JoinPredicate, storage::schema::Schema,
    storage::tuple::Tuple,
};

/// Nested-loop join: for every outer tuple the inner child is rewound
/// and scanned in full.
pub struct Join<O: OpIterator, I: OpIterator> {
    predicate: JoinPredicate,
    outer: O,
    inner: I,

    current_outer: Option<Tuple>,
}

impl<O: OpIterator, I: OpIterator> Join<O, I> {
    pub fn new(predicate: JoinPredicate, outer: O, inner: I) -> Self {
        Self {
            predicate,
            outer,
            inner,
            current_outer: None,
        }
    }

    fn merge(outer: &Tuple, inner: &Tuple) -> Tuple {
        let mut cells = outer.get_cells();
        cells.extend(inner.get_cells());
        Tuple::new(&cells)
    }
}

impl<O: OpIterator, I: OpIterator> Iterator for Join<O, I> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_outer.is_none() {
                self.current_outer = Some(self.outer.next()?);
                self.inner.rewind();
            }

            let outer_tuple = self.current_outer.clone().unwrap();
            while let Some(inner_tuple) = self.inner.next() {
                if self.predicate.matches(&outer_tuple, &inner_tuple) {
                    return Some(Self::merge(&outer_tuple, &inner_tuple));
                }
            }

            self.current_outer = None;
        }
    }
}

impl<O: OpIterator, I: OpIterator> OpIterator for Join<O, I> {
    fn rewind(&mut self) {
        self.outer.rewind();
        self.inner.rewind();
        self.current_outer = None;
    }

    fn get_schema(&self) -> Schema {
        Schema::merge(&self.outer.get_schema(), &self.inner.get_schema())
    }
}
