mod common;

use common::*;
use heap_db::{
    executor::{Aggregate, AggregateOp, Delete, Filter, Insert, Join, OpIterator, SeqScan},
    predicate::{JoinPredicate, Op, Predicate},
    storage::schema::{small_int_schema, Schema},
    storage::tuple::{Cell, Tuple},
    transaction::Transaction,
    utils::HandyRwLock,
    Database,
};

/// Feeds a fixed list of tuples into a plan; the executor-side stand-in
/// for a VALUES clause.
struct Rows {
    schema: Schema,
    rows: Vec<Tuple>,
    cursor: usize,
}

impl Rows {
    fn new(schema: &Schema, rows: Vec<Tuple>) -> Self {
        Self {
            schema: schema.clone(),
            rows,
            cursor: 0,
        }
    }
}

impl Iterator for Rows {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor < self.rows.len() {
            let tuple = self.rows[self.cursor].clone();
            self.cursor += 1;
            Some(tuple)
        } else {
            None
        }
    }
}

impl OpIterator for Rows {
    fn rewind(&mut self) {
        self.cursor = 0;
    }

    fn get_schema(&self) -> Schema {
        self.schema.clone()
    }
}

fn int_tuple(values: &[i32]) -> Tuple {
    let cells: Vec<Cell> = values.iter().map(|v| Cell::Int32(*v)).collect();
    Tuple::new(&cells)
}

fn seed_int_table(file_name: &str, width: usize, rows: &[Vec<i32>]) -> u32 {
    let schema = small_int_schema(width, "");
    let table_rc = new_empty_table(file_name, &schema);
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    for row in rows {
        let mut tuple = int_tuple(row);
        Database::buffer_pool()
            .insert_tuple(&tx, table_id, &mut tuple)
            .unwrap();
    }
    tx.commit().unwrap();
    table_id
}

#[test]
fn test_filter_over_scan() {
    setup();
    let rows: Vec<Vec<i32>> = (0..10).map(|i| vec![i, i * 10]).collect();
    let table_id = seed_int_table("exec_filter.dat", 2, &rows);

    let tx = Transaction::new();
    let scan = SeqScan::new(&tx, table_id, "t");
    let mut filter = Filter::new(
        Predicate::new(0, Op::GreaterThanOrEq, &Cell::Int32(5)),
        scan,
    );

    let matched: Vec<Tuple> = filter.by_ref().collect();
    assert_eq!(matched.len(), 5);
    assert_eq!(matched[0].get_cell(0), Cell::Int32(5));
    assert_eq!(matched[0].get_cell(1), Cell::Int32(50));

    // a rewound filter yields the same rows again
    filter.rewind();
    assert_eq!(filter.count(), 5);
    tx.commit().unwrap();
}

#[test]
fn test_nested_loop_join() {
    setup();
    let left_rows: Vec<Vec<i32>> = vec![vec![1, 100], vec![2, 200], vec![3, 300]];
    let right_rows: Vec<Vec<i32>> = vec![vec![2, -2], vec![3, -3], vec![4, -4]];
    let left_id = seed_int_table("exec_join_left.dat", 2, &left_rows);
    let right_id = seed_int_table("exec_join_right.dat", 2, &right_rows);

    let tx = Transaction::new();
    let join = Join::new(
        JoinPredicate::new(0, Op::Equals, 0),
        SeqScan::new(&tx, left_id, "l"),
        SeqScan::new(&tx, right_id, "r"),
    );
    assert_eq!(join.get_schema().fields_count(), 4);

    let joined: Vec<Tuple> = join.collect();
    assert_eq!(joined.len(), 2);
    assert_eq!(joined[0], int_tuple(&[2, 200, 2, -2]));
    assert_eq!(joined[1], int_tuple(&[3, 300, 3, -3]));
    tx.commit().unwrap();
}

#[test]
fn test_aggregate_without_grouping() {
    setup();
    let rows: Vec<Vec<i32>> = vec![vec![1, 4], vec![2, 9], vec![3, 2]];
    let table_id = seed_int_table("exec_agg_plain.dat", 2, &rows);

    let tx = Transaction::new();
    let cases = [
        (AggregateOp::Count, 3),
        (AggregateOp::Sum, 15),
        (AggregateOp::Avg, 5),
        (AggregateOp::Min, 2),
        (AggregateOp::Max, 9),
    ];
    for &(op, expected) in cases.iter() {
        let scan = SeqScan::new(&tx, table_id, "t");
        let mut agg = Aggregate::new(scan, op, 1, None);

        let result = agg.next().unwrap();
        assert_eq!(result.cells_count(), 1);
        assert_eq!(result.get_cell(0), Cell::Int32(expected), "{:?}", op);
        assert!(agg.next().is_none());
    }
    tx.commit().unwrap();
}

#[test]
fn test_aggregate_with_grouping() {
    setup();
    // group 1 -> {5, 7}, group 2 -> {10}, group 3 -> {1, 2, 3}
    let rows: Vec<Vec<i32>> = vec![
        vec![1, 5],
        vec![1, 7],
        vec![2, 10],
        vec![3, 1],
        vec![3, 2],
        vec![3, 3],
    ];
    let table_id = seed_int_table("exec_agg_group.dat", 2, &rows);

    let tx = Transaction::new();
    let scan = SeqScan::new(&tx, table_id, "t");
    let agg = Aggregate::new(scan, AggregateOp::Sum, 1, Some(0));
    assert_eq!(agg.get_schema().fields_count(), 2);

    let grouped: Vec<Tuple> = agg.collect();
    assert_eq!(grouped.len(), 3);
    assert_eq!(grouped[0], int_tuple(&[1, 12]));
    assert_eq!(grouped[1], int_tuple(&[2, 10]));
    assert_eq!(grouped[2], int_tuple(&[3, 6]));
    tx.commit().unwrap();
}

#[test]
fn test_insert_and_delete_operators() {
    setup();
    let schema = small_int_schema(2, "");
    let table_rc = new_empty_table("exec_insert_delete.dat", &schema);
    let table_id = table_rc.rl().get_id();

    // insert three literal rows through the write operator
    let t1 = Transaction::new();
    let rows = Rows::new(
        &schema,
        vec![
            int_tuple(&[1, 10]),
            int_tuple(&[2, 20]),
            int_tuple(&[3, 30]),
        ],
    );
    let inserted = Insert::new(&t1, table_id, rows).execute().unwrap();
    assert_eq!(inserted, int_tuple(&[3]));
    t1.commit().unwrap();

    // delete the rows with key >= 2, reported as a one-field count
    let t2 = Transaction::new();
    let doomed = Filter::new(
        Predicate::new(0, Op::GreaterThanOrEq, &Cell::Int32(2)),
        SeqScan::new(&t2, table_id, "t"),
    );
    let deleted = Delete::new(&t2, doomed).execute().unwrap();
    assert_eq!(deleted, int_tuple(&[2]));
    t2.commit().unwrap();

    let t3 = Transaction::new();
    let survivors: Vec<Tuple> = SeqScan::new(&t3, table_id, "t").collect();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0], int_tuple(&[1, 10]));
    t3.commit().unwrap();
}
