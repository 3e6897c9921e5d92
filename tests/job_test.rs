use std::time::Duration;
use vcoc::config::Config;
use vcoc::error::HeatError;
use vcoc::job::{FileJobStore, JobScheduler, JobStore, MemoryJobStore, SliceOutcome, SummaryRefresh, SummaryRefreshJob};
use vcoc::sheet::Sheet;
use vcoc::spreadsheet::Spreadsheet;

fn meet(event_sheets: usize) -> Spreadsheet {
    let mut book = Spreadsheet::new();
    book.add_sheet(Sheet::from_rows("Sheet1", vec![vec!["Event 1".into()]]));
    for n in 1..=event_sheets {
        book.add_sheet(Sheet::from_rows(
            n.to_string(),
            vec![vec![format!("Event {}", n).into()], vec!["".into(), "Ann".into()]],
        ));
    }
    book
}

fn lanes_on(book: &Spreadsheet, sheet: &str) -> String {
    book.sheet(sheet).unwrap().get_a1("K4").unwrap().to_string()
}

#[test]
fn zero_budget_pauses_after_every_sheet() {
    println!("\n====== Testing sliced refresh ======");
    let config = Config::default();
    let store = MemoryJobStore::new();
    let refresh = SummaryRefresh::new(&config, &store);
    let mut book = meet(3);

    let mut job = refresh.begin(8).unwrap();
    let outcome = refresh.run_slice(&mut book, &mut job, Duration::ZERO).unwrap();
    assert_eq!(outcome, SliceOutcome::Paused { cursor: 1, updated: 1 });
    assert_eq!(lanes_on(&book, "1"), "8");
    assert_eq!(lanes_on(&book, "2"), "");
    assert_eq!(store.pending().unwrap().map(|j| j.cursor), Some(1));
    println!("✓ Paused after sheet 1");

    // a later call picks the job back up
    let mut resumed = refresh.begin(8).unwrap();
    assert_eq!(resumed.id, job.id);
    assert_eq!(resumed.cursor, 1);

    let outcome = refresh.run_slice(&mut book, &mut resumed, Duration::ZERO).unwrap();
    assert_eq!(outcome, SliceOutcome::Paused { cursor: 2, updated: 1 });
    let outcome = refresh.run_slice(&mut book, &mut resumed, Duration::ZERO).unwrap();
    assert_eq!(outcome, SliceOutcome::Completed { updated: 1 });

    for sheet in ["1", "2", "3"] {
        assert_eq!(lanes_on(&book, sheet), "8");
    }
    assert!(store.pending().unwrap().is_none());
    assert_eq!(lanes_on(&book, "Sheet1"), "");
    println!("✓ Completed and cleared from the store");
}

#[test]
fn resumed_job_uses_the_new_lane_count() {
    let config = Config::default();
    let store = MemoryJobStore::new();
    let refresh = SummaryRefresh::new(&config, &store);
    let mut book = meet(2);

    let mut job = refresh.begin(8).unwrap();
    refresh.run_slice(&mut book, &mut job, Duration::ZERO).unwrap();

    let mut resumed = refresh.begin(6).unwrap();
    let outcome = refresh.run_slice(&mut book, &mut resumed, Duration::from_secs(60)).unwrap();

    assert_eq!(outcome, SliceOutcome::Completed { updated: 1 });
    assert_eq!(lanes_on(&book, "1"), "8");
    assert_eq!(lanes_on(&book, "2"), "6");
}

#[test]
fn generous_budget_finishes_in_one_slice() {
    let config = Config::default();
    let store = MemoryJobStore::new();
    let refresh = SummaryRefresh::new(&config, &store);
    let mut book = meet(4);

    let mut job = refresh.begin(10).unwrap();
    let outcome = refresh.run_slice(&mut book, &mut job, Duration::from_secs(60)).unwrap();

    assert_eq!(outcome, SliceOutcome::Completed { updated: 4 });
    assert!(store.pending().unwrap().is_none());
}

#[test]
fn scheduler_drives_every_slice() {
    let config = Config::default();
    let store = MemoryJobStore::new();
    let mut book = meet(5);

    let updated = JobScheduler::new(&config, &store)
        .with_budget(Duration::ZERO)
        .drive(&mut book, 7)
        .unwrap();

    assert_eq!(updated, 5);
    assert_eq!(lanes_on(&book, "5"), "7");
    assert!(store.pending().unwrap().is_none());
    println!("✓ Scheduler refreshed {} sheets", updated);
}

#[test]
fn refresh_preconditions() {
    println!("\n====== Testing refresh preconditions ======");
    let store = MemoryJobStore::new();

    let config = Config::default();
    let err = JobScheduler::new(&config, &store).drive(&mut meet(0), 8).unwrap_err();
    assert!(matches!(err, HeatError::NothingToUpdate));

    let mut small = Config::default();
    small.job.max_sheets = 2;
    let mut book = meet(3);
    let err = JobScheduler::new(&small, &store).drive(&mut book, 8).unwrap_err();
    assert!(matches!(err, HeatError::TooManySheets(3)));
    assert_eq!(lanes_on(&book, "1"), "");

    let err = SummaryRefresh::new(&config, &store).begin(17).unwrap_err();
    assert!(matches!(err, HeatError::InvalidLaneCount(17)));
    println!("✓ Preconditions enforced");
}

#[test]
fn file_store_keeps_the_latest_job() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileJobStore::new(dir.path().join("jobs"));
    assert!(store.pending().unwrap().is_none());

    let mut older = SummaryRefreshJob::new(8);
    older.cursor = 3;
    store.save(&older).unwrap();

    let mut newer = SummaryRefreshJob::new(6);
    newer.updated_at = older.updated_at + chrono::Duration::seconds(5);
    store.save(&newer).unwrap();

    assert_eq!(store.pending().unwrap(), Some(newer.clone()));

    store.remove(&newer.id).unwrap();
    assert_eq!(store.pending().unwrap(), Some(older.clone()));
    store.remove(&older.id).unwrap();
    store.remove(&older.id).unwrap();
    assert!(store.pending().unwrap().is_none());
}

#[test]
fn file_store_survives_between_refreshes() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    let mut book = meet(2);

    let paused_id = {
        let store = FileJobStore::new(dir.path());
        let refresh = SummaryRefresh::new(&config, &store);
        let mut job = refresh.begin(8).unwrap();
        refresh.run_slice(&mut book, &mut job, Duration::ZERO).unwrap();
        job.id
    };

    let store = FileJobStore::new(dir.path());
    let refresh = SummaryRefresh::new(&config, &store);
    let mut job = refresh.begin(8).unwrap();
    assert_eq!(job.id, paused_id);
    assert_eq!(job.cursor, 1);

    let outcome = refresh.run_slice(&mut book, &mut job, Duration::ZERO).unwrap();
    assert_eq!(outcome, SliceOutcome::Completed { updated: 1 });
    assert!(store.pending().unwrap().is_none());
}
