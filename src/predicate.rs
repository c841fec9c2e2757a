use std::fmt;

use crate::storage::tuple::{Cell, Tuple};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Equals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    NotEquals,
}

impl Op {
    fn compare(&self, left: &Cell, right: &Cell) -> bool {
        match self {
            Op::Equals => left == right,
            Op::GreaterThan => left > right,
            Op::GreaterThanOrEq => left >= right,
            Op::LessThan => left < right,
            Op::LessThanOrEq => left <= right,
            Op::NotEquals => left != right,
        }
    }
}

/// Compares one field of a tuple against a constant.
#[derive(Clone)]
pub struct Predicate {
    pub field_index: usize,
    pub op: Op,
    pub cell: Cell,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, cell: &Cell) -> Self {
        Self {
            field_index,
            op,
            cell: cell.clone(),
        }
    }

    pub fn matches(&self, tuple: &Tuple) -> bool {
        self.op.compare(&tuple.get_cell(self.field_index), &self.cell)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "field_index: {}, op: {:?}, cell: {:?}",
            self.field_index, self.op, self.cell
        )
    }
}

/// Compares one field of an outer tuple against one field of an inner
/// tuple.
#[derive(Clone, Copy)]
pub struct JoinPredicate {
    pub outer_field: usize,
    pub op: Op,
    pub inner_field: usize,
}

impl JoinPredicate {
    pub fn new(outer_field: usize, op: Op, inner_field: usize) -> Self {
        Self {
            outer_field,
            op,
            inner_field,
        }
    }

    pub fn matches(&self, outer: &Tuple, inner: &Tuple) -> bool {
        self.op.compare(
            &outer.get_cell(self.outer_field),
            &inner.get_cell(self.inner_field),
        )
    }
}
