//! Pull-based query operators. Every operator is a plain
//! `Iterator<Item = Tuple>` that can also be rewound, the same shape
//! the table scan has; plans are built by nesting them.

mod aggregate;
mod delete;
mod filter;
mod insert;
mod join;
mod seq_scan;

pub use aggregate::{Aggregate, AggregateOp};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use seq_scan::SeqScan;

use crate::storage::schema::Schema;
use crate::storage::tuple::Tuple;

pub trait OpIterator: Iterator<Item = Tuple> {
    /// Restart the operator from its first output tuple.
    fn rewind(&mut self);

    /// The descriptor of the tuples this operator produces.
    fn get_schema(&self) -> Schema;
}
