use std::{cmp::Ordering, collections::HashMap};

use itertools::Itertools;

use crate::{
    executor::OpIterator,
    storage::schema::{FieldItem, Schema, Type},
    storage::tuple::{Cell, Tuple},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Default)]
struct Accumulator {
    count: i32,
    sum: i64,
    min: Option<Cell>,
    max: Option<Cell>,
}

impl Accumulator {
    fn feed(&mut self, cell: &Cell) {
        self.count += 1;
        if let Cell::Int32(v) = cell {
            self.sum += *v as i64;
        }

        let replace_min = match &self.min {
            Some(best) => cell.partial_cmp(best) == Some(Ordering::Less),
            None => true,
        };
        if replace_min {
            self.min = Some(cell.clone());
        }

        let replace_max = match &self.max {
            Some(best) => cell.partial_cmp(best) == Some(Ordering::Greater),
            None => true,
        };
        if replace_max {
            self.max = Some(cell.clone());
        }
    }

    fn result(&self, op: AggregateOp) -> Cell {
        match op {
            AggregateOp::Count => Cell::Int32(self.count),
            AggregateOp::Sum => Cell::Int32(self.sum as i32),
            // integer average, truncated
            AggregateOp::Avg => Cell::Int32((self.sum / self.count as i64) as i32),
            AggregateOp::Min => self.min.clone().expect("aggregate over no rows"),
            AggregateOp::Max => self.max.clone().expect("aggregate over no rows"),
        }
    }
}

/// Groups the child's tuples by an optional field and folds one
/// aggregate over another field. Output is one tuple per group:
/// `(group, aggregate)`, or a single `(aggregate)` tuple when no group
/// field is given. Groups come out in ascending group order so plans
/// are deterministic.
pub struct Aggregate<C: OpIterator> {
    child: C,
    op: AggregateOp,
    agg_field: usize,
    group_field: Option<usize>,

    results: Option<Vec<Tuple>>,
    cursor: usize,
}

impl<C: OpIterator> Aggregate<C> {
    pub fn new(child: C, op: AggregateOp, agg_field: usize, group_field: Option<usize>) -> Self {
        Self {
            child,
            op,
            agg_field,
            group_field,
            results: None,
            cursor: 0,
        }
    }

    fn compute(&mut self) -> Vec<Tuple> {
        let mut groups: HashMap<Option<Cell>, Accumulator> = HashMap::new();

        while let Some(tuple) = self.child.next() {
            let key = self.group_field.map(|i| tuple.get_cell(i));
            groups
                .entry(key)
                .or_insert_with(Accumulator::default)
                .feed(&tuple.get_cell(self.agg_field));
        }

        let op = self.op;
        groups
            .into_iter()
            .sorted_by(|(k1, _), (k2, _)| match (k1, k2) {
                (Some(a), Some(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            })
            .map(|(key, acc)| match key {
                Some(group) => Tuple::new(&[group, acc.result(op)]),
                None => Tuple::new(&[acc.result(op)]),
            })
            .collect()
    }
}

impl<C: OpIterator> Iterator for Aggregate<C> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        if self.results.is_none() {
            let results = self.compute();
            self.results = Some(results);
            self.cursor = 0;
        }

        let results = self.results.as_ref().unwrap();
        if self.cursor < results.len() {
            let tuple = results[self.cursor].clone();
            self.cursor += 1;
            Some(tuple)
        } else {
            None
        }
    }
}

impl<C: OpIterator> OpIterator for Aggregate<C> {
    fn rewind(&mut self) {
        self.child.rewind();
        self.results = None;
        self.cursor = 0;
    }

    fn get_schema(&self) -> Schema {
        let child_schema = self.child.get_schema();
        let agg_type = match self.op {
            AggregateOp::Min | AggregateOp::Max => child_schema.get_field_type(self.agg_field),
            _ => Type::Int,
        };
        let agg_name = format!(
            "{:?}({})",
            self.op, child_schema.fields[self.agg_field].field_name
        );

        match self.group_field {
            Some(group) => Schema::new(vec![
                child_schema.fields[group].clone(),
                FieldItem::new(&agg_name, agg_type),
            ]),
            None => Schema::new(vec![FieldItem::new(&agg_name, agg_type)]),
        }
    }
}
