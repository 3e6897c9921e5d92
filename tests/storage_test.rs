use std::fs;
use tempfile::tempdir;
use vcoc::config::{ColumnDetection, Config};
use vcoc::downloader::to_csv;
use vcoc::loader::import_file;
use vcoc::ranker::RankAssigner;
use vcoc::saving::{load_or_default, load_spreadsheet, save_spreadsheet};
use vcoc::spreadsheet::Spreadsheet;

#[test]
fn imported_csv_is_ranked_saved_and_exported() {
    println!("\n====== Testing import, rank, save, export ======");
    let dir = tempdir().unwrap();
    let csv = dir.path().join("Event 2.csv");
    fs::write(
        &csv,
        "Preliminaries,,,\n,\"Lee, Ann\",30.00,\n,Kim Bea,30.00,\n,Cho Cal,29.10,Scr\n,Diaz Dee,31.25,\n",
    )
    .unwrap();

    let mut book = Spreadsheet::new();
    assert_eq!(import_file(&mut book, &csv).unwrap(), "Event 2");
    println!("✓ Imported sheet 'Event 2'");

    let mut config = Config::default();
    config.rank.detection = ColumnDetection::Explicit { time: 2, status: 3 };
    let ranker = RankAssigner::new(&config).unwrap();
    ranker.rerank(book.sheet_mut("Event 2").unwrap()).unwrap();

    let path = dir.path().join("meet.bin.gz");
    save_spreadsheet(&book, &path).unwrap();
    let loaded = load_spreadsheet(&path).unwrap();
    assert_eq!(loaded, book);

    let sheet = loaded.sheet("Event 2").unwrap();
    assert_eq!(sheet.background(2, 1), Some("#FF66FF"));
    assert_eq!(sheet.background(4, 1), Some("#FFFF00"));
    assert_eq!(
        to_csv(sheet),
        "Preliminaries,,,\n*1,\"Lee, Ann\",30.00,\n*1,Kim Bea,30.00,\n,Cho Cal,29.10,Scr\n3,Diaz Dee,31.25,\n"
    );
    println!("✓ Ranks and colors survive a save and load");
}

#[test]
fn unknown_extensions_are_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("entries.txt");
    fs::write(&path, "a,b\n").unwrap();

    let mut book = Spreadsheet::new();
    let err = import_file(&mut book, &path).unwrap_err();
    assert_eq!(err.to_string(), "Import failed: Unsupported file extension: txt");
    assert!(book.sheets.is_empty());
}

#[test]
fn missing_workbook_starts_empty() {
    let dir = tempdir().unwrap();
    let book = load_or_default(dir.path().join("new.bin.gz")).unwrap();
    assert!(book.sheets.is_empty());

    let garbage = dir.path().join("broken.bin.gz");
    fs::write(&garbage, b"not a workbook").unwrap();
    assert!(load_spreadsheet(&garbage).is_err());
}
