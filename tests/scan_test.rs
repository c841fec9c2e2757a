mod common;

use common::*;
use heap_db::{
    executor::{OpIterator, SeqScan},
    storage::schema::small_int_schema,
    storage::tuple::{Cell, Tuple},
    transaction::Transaction,
    utils::HandyRwLock,
    Database,
};
use rand::Rng;

#[test]
fn test_insert_then_scan() {
    setup();
    let table_rc = new_empty_table("s1_insert_scan.dat", &int_string_schema());
    let table_id = table_rc.rl().get_id();

    let t1 = Transaction::new();
    for &(n, s) in [(1, "a"), (2, "b"), (3, "c")].iter() {
        let mut tuple = int_string_tuple(n, s);
        Database::buffer_pool()
            .insert_tuple(&t1, table_id, &mut tuple)
            .unwrap();
    }
    t1.commit().unwrap();

    // a later transaction sees the three tuples in insertion order,
    // sitting in slots 0..2 of page 0
    let t2 = Transaction::new();
    let scan = SeqScan::new(&t2, table_id, "");
    let rows: Vec<Tuple> = scan.collect();
    assert_eq!(rows.len(), 3);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.get_cell(0), Cell::Int32(i as i32 + 1));

        let rid = row.get_rid().unwrap();
        assert_eq!(rid.pid.page_index, 0);
        assert_eq!(rid.slot, i);
    }
    t2.commit().unwrap();
}

#[test]
fn test_delete_reopens_slot() {
    setup();
    let table_rc = new_empty_table("s2_delete_slot.dat", &int_string_schema());
    let table_id = table_rc.rl().get_id();

    let t1 = Transaction::new();
    for &(n, s) in [(1, "a"), (2, "b"), (3, "c")].iter() {
        let mut tuple = int_string_tuple(n, s);
        Database::buffer_pool()
            .insert_tuple(&t1, table_id, &mut tuple)
            .unwrap();
    }
    t1.commit().unwrap();

    // delete the tuple sitting in slot 1
    let t3 = Transaction::new();
    let victim = SeqScan::new(&t3, table_id, "")
        .find(|t| t.get_rid().unwrap().slot == 1)
        .unwrap();
    Database::buffer_pool().delete_tuple(&t3, &victim).unwrap();
    t3.commit().unwrap();

    // the freed slot is the lowest empty one, so the next insert lands
    // in it
    let t4 = Transaction::new();
    let mut tuple = int_string_tuple(4, "d");
    Database::buffer_pool()
        .insert_tuple(&t4, table_id, &mut tuple)
        .unwrap();
    t4.commit().unwrap();

    let rid = tuple.get_rid().unwrap();
    assert_eq!(rid.pid.page_index, 0);
    assert_eq!(rid.slot, 1);

    let t5 = Transaction::new();
    let rows: Vec<Tuple> = SeqScan::new(&t5, table_id, "").collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].get_cell(0), Cell::Int32(4));
    t5.commit().unwrap();
}

#[test]
fn test_scan_covers_multiple_pages() {
    setup();
    let table_rc = new_empty_table("scan_multi_page.dat", &int_string_schema());
    let table_id = table_rc.rl().get_id();

    // 30 tuples fit on one 4096-byte page with this schema, so 75
    // inserts span three pages
    let rows = 75;
    let t1 = Transaction::new();
    for i in 0..rows {
        let mut tuple = int_string_tuple(i, &format!("row{}", i));
        Database::buffer_pool()
            .insert_tuple(&t1, table_id, &mut tuple)
            .unwrap();
    }
    t1.commit().unwrap();
    assert_eq!(table_rc.rl().num_pages().unwrap(), 3);

    let t2 = Transaction::new();
    let mut scan = SeqScan::new(&t2, table_id, "");
    let mut count = 0;
    for tuple in scan.by_ref() {
        assert_eq!(tuple.get_cell(0), Cell::Int32(count));
        count += 1;
    }
    assert_eq!(count, rows);

    // rewinding restarts from page 0, slot 0
    scan.rewind();
    let first = scan.next().unwrap();
    assert_eq!(first.get_cell(0), Cell::Int32(0));
    assert_eq!(first.get_rid().unwrap().pid.page_index, 0);
    t2.commit().unwrap();
}

#[test]
fn test_scan_of_empty_table() {
    setup();
    let table_rc = new_empty_table("scan_empty.dat", &int_string_schema());
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    assert!(SeqScan::new(&tx, table_id, "").next().is_none());
    tx.commit().unwrap();
}

#[test]
fn test_scan_preserves_insert_order_for_random_rows() {
    setup();
    let schema = small_int_schema(3, "");
    let table_rc = new_empty_table("scan_random_rows.dat", &schema);
    let table_id = table_rc.rl().get_id();

    let mut rng = rand::thread_rng();
    let values: Vec<i32> = (0..200).map(|_| rng.gen_range(-10_000, 10_000)).collect();

    let tx = Transaction::new();
    for &v in &values {
        let mut tuple = Tuple::new_int_tuples(v, 3);
        Database::buffer_pool()
            .insert_tuple(&tx, table_id, &mut tuple)
            .unwrap();
    }
    tx.commit().unwrap();

    let t2 = Transaction::new();
    let scanned: Vec<Tuple> = SeqScan::new(&t2, table_id, "").collect();
    assert_eq!(scanned.len(), values.len());
    for (tuple, &v) in scanned.iter().zip(&values) {
        assert_eq!(tuple.get_cell(0), Cell::Int32(v));
    }
    t2.commit().unwrap();
}

#[test]
fn test_file_length_stays_page_aligned() {
    setup();
    let table_rc = new_empty_table("scan_page_aligned.dat", &int_string_schema());
    let table_id = table_rc.rl().get_id();

    let page_size = heap_db::BufferPool::get_page_size();
    let tx = Transaction::new();
    for i in 0..35 {
        let mut tuple = int_string_tuple(i, "x");
        Database::buffer_pool()
            .insert_tuple(&tx, table_id, &mut tuple)
            .unwrap();
    }
    tx.commit().unwrap();

    let len = std::fs::metadata(table_path("scan_page_aligned.dat"))
        .unwrap()
        .len() as usize;
    assert_eq!(len % page_size, 0);
    assert_eq!(len / page_size, table_rc.rl().num_pages().unwrap());
    assert_eq!(table_rc.rl().num_pages().unwrap(), 2);
}
