use parking_lot::Mutex;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;
use vcoc::cell::CellValue;
use vcoc::config::Config;
use vcoc::lock::SheetLocks;
use vcoc::sheet::Sheet;
use vcoc::splitter::{RowSplitter, SplitOutcome};
use vcoc::spreadsheet::Spreadsheet;

const SHEET: &str = "Form Responses 1";

fn header() -> Vec<CellValue> {
    [
        "Timestamp", "Name", "Age", "Team", "Gender", "Email", "Events", "Status", "Seed", "Notes",
    ]
    .iter()
    .map(|h| CellValue::text(*h))
    .collect()
}

// A response row with columns G..J filled in
fn response(name: &str, g: &str, h: &str, i: &str, j: &str) -> Vec<CellValue> {
    let mut row = vec![
        CellValue::text("10/18/2026 9:00:00"),
        CellValue::text(name),
        CellValue::Number(10.0),
        CellValue::text("VCOC"),
        CellValue::text("F"),
        CellValue::text("parent@example.com"),
    ];
    row.extend([g, h, i, j].iter().map(|v| CellValue::parse(v)));
    row
}

fn form_sheet(rows: Vec<Vec<CellValue>>) -> Sheet {
    let mut all = vec![header()];
    all.extend(rows);
    Sheet::from_rows(SHEET, all)
}

fn assert_row(sheet: &Sheet, row: u32, name: &str, g: &str, h: &str) {
    assert_eq!(sheet.get(row, 2).to_string(), name, "name on row {}", row);
    assert_eq!(sheet.get(row, 7).to_string(), g, "column G on row {}", row);
    assert_eq!(sheet.get(row, 8).to_string(), h, "column H on row {}", row);
    println!("✓ Row {}: {} / {} / {}", row, name, g, h);
}

#[test]
fn comma_list_becomes_one_row_per_item() {
    println!("\n====== Testing comma list split ======");
    let mut sheet = form_sheet(vec![response("Ann", "50 Free, 100 Back", "X", "", "")]);

    let report = RowSplitter::new(&Config::default()).split(&mut sheet);

    assert_eq!(report.data_rows_before, 1);
    assert_eq!(report.data_rows_after, 2);
    assert_eq!(report.rows_split, 1);
    assert_row(&sheet, 2, "Ann", "50 Free", "X");
    assert_row(&sheet, 3, "Ann", "100 Back", "X");
    assert_eq!(sheet.last_row(), 3);
}

#[test]
fn shorter_lists_repeat_their_last_item() {
    println!("\n====== Testing uneven lists ======");
    let mut sheet = form_sheet(vec![response("Bea", "A,B,C", "", "1, 2", "")]);

    RowSplitter::new(&Config::default()).split(&mut sheet);

    let seeds: Vec<String> = (2..=4).map(|r| sheet.get(r, 9).to_string()).collect();
    let events: Vec<String> = (2..=4).map(|r| sheet.get(r, 7).to_string()).collect();
    assert_eq!(events, ["A", "B", "C"]);
    assert_eq!(seeds, ["1", "2", "2"]);
    println!("✓ Seeds {:?}", seeds);
}

#[test]
fn rows_keep_their_order_around_a_split() {
    let mut sheet = form_sheet(vec![
        response("Ann", "50 Free", "", "", ""),
        response("Bea", "50 Free, 50 Fly", "", "", ""),
        response("Cal", "100 IM", "", "", ""),
    ]);

    let report = RowSplitter::new(&Config::default()).split(&mut sheet);

    assert_eq!(report.data_rows_after, 4);
    assert_row(&sheet, 2, "Ann", "50 Free", "");
    assert_row(&sheet, 3, "Bea", "50 Free", "");
    assert_row(&sheet, 4, "Bea", "50 Fly", "");
    assert_row(&sheet, 5, "Cal", "100 IM", "");
    assert_eq!(sheet.get(1, 7).to_string(), "Events");
}

#[test]
fn rows_without_lists_are_left_alone() {
    println!("\n====== Testing passthrough rows ======");
    let mut sheet = form_sheet(vec![
        response("Ann", "50 Free", "", "", ""),
        response("Bea", "A,", "", "", ""),
        response("Cal", " , ", "", "", ""),
    ]);
    let before = sheet.clone();

    let report = RowSplitter::new(&Config::default()).split(&mut sheet);

    assert_eq!(report.rows_split, 0);
    assert_eq!(sheet, before);
    println!("✓ Sheet unchanged");
}

#[test]
fn commas_outside_the_split_columns_are_ignored() {
    let mut sheet = form_sheet(vec![response("Lee, Ann", "50 Free", "", "", "")]);
    let before = sheet.clone();

    let report = RowSplitter::new(&Config::default()).split(&mut sheet);

    assert_eq!(report.rows_split, 0);
    assert_eq!(sheet, before);
}

#[test]
fn header_only_sheet_is_a_no_op() {
    let mut sheet = form_sheet(vec![]);
    let report = RowSplitter::new(&Config::default()).split(&mut sheet);
    assert_eq!(report.data_rows_before, 0);
    assert_eq!(sheet.last_row(), 1);
}

#[test]
fn split_waits_out_a_held_lock_then_reports_timeout() {
    println!("\n====== Testing lock timeout ======");
    let mut config = Config::default();
    config.split.lock_timeout_ms = 20;

    let mut book = Spreadsheet::new();
    book.add_sheet(form_sheet(vec![response("Ann", "A,B", "", "", "")]));
    let book = Mutex::new(book);
    let locks = SheetLocks::new();

    let holder = locks.clone();
    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let handle = thread::spawn(move || {
        holder
            .run_exclusive(SHEET, Duration::from_secs(5), || {
                held_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })
            .unwrap();
    });
    held_rx.recv().unwrap();

    let splitter = RowSplitter::new(&config);
    let outcome = splitter.split_exclusive(&book, &locks, SHEET).unwrap();
    assert!(matches!(outcome, SplitOutcome::LockTimeout { .. }));
    assert_eq!(book.lock().sheet(SHEET).unwrap().last_row(), 2);
    println!("✓ Busy sheet left untouched: {:?}", outcome);

    release_tx.send(()).unwrap();
    handle.join().unwrap();

    let outcome = splitter.split_exclusive(&book, &locks, SHEET).unwrap();
    assert!(matches!(outcome, SplitOutcome::Completed(ref r) if r.rows_split == 1));
    assert_eq!(book.lock().sheet(SHEET).unwrap().last_row(), 3);
}

#[test]
fn concurrent_splits_do_not_duplicate_rows() {
    println!("\n====== Testing concurrent splits ======");
    let mut book = Spreadsheet::new();
    book.add_sheet(form_sheet(vec![
        response("Ann", "A,B,C", "", "", ""),
        response("Bea", "D", "", "", ""),
        response("Cal", "E,F", "", "", ""),
    ]));
    let book = Arc::new(Mutex::new(book));
    let locks = SheetLocks::new();
    let config = Config::default();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let book = Arc::clone(&book);
            let locks = locks.clone();
            let splitter = RowSplitter::new(&config);
            thread::spawn(move || splitter.split_exclusive(&book, &locks, SHEET).unwrap())
        })
        .collect();

    let expanded: usize = handles
        .into_iter()
        .map(|h| match h.join().unwrap() {
            SplitOutcome::Completed(report) => report.rows_split,
            SplitOutcome::LockTimeout { .. } => panic!("lock timed out"),
        })
        .sum();

    let book = book.lock();
    let sheet = book.sheet(SHEET).unwrap();
    let events: Vec<String> = (2..=sheet.last_row()).map(|r| sheet.get(r, 7).to_string()).collect();
    assert_eq!(events, ["A", "B", "C", "D", "E", "F"]);
    // only the first split to take the lock had anything to expand
    assert_eq!(expanded, 2);
    println!("✓ Events after concurrent splits: {:?}", events);
}

#[test]
fn missing_sheet_is_an_error() {
    let book = Mutex::new(Spreadsheet::new());
    let result = RowSplitter::new(&Config::default()).split_exclusive(&book, &SheetLocks::new(), "Nope");
    assert!(result.is_err());
}
