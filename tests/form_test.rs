use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use vcoc::config::Config;
use vcoc::error::{HeatError, Result};
use vcoc::lock::SheetLocks;
use vcoc::mailer::{self, Answer, ConfirmationEmail, FormResponse, ItemResponse, Notifier};
use vcoc::sheet::Sheet;
use vcoc::splitter::{RowSplitter, SplitOutcome, SplitReport};
use vcoc::spreadsheet::Spreadsheet;

const SHEET: &str = "Form Responses 1";

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<ConfirmationEmail>>,
}

impl Notifier for RecordingNotifier {
    fn send(&self, email: &ConfirmationEmail) -> Result<()> {
        self.sent.lock().push(email.clone());
        Ok(())
    }
}

struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn send(&self, _email: &ConfirmationEmail) -> Result<()> {
        Err(HeatError::Notify("smtp down".into()))
    }
}

fn single(question: &str, answer: &str) -> ItemResponse {
    ItemResponse {
        question: question.into(),
        answer: Answer::Single(answer.into()),
    }
}

// Questions land in B..F, the event checkboxes in G
fn entry_form(name: &str, events: &[&str], email: &str) -> FormResponse {
    FormResponse {
        respondent_email: None,
        items: vec![
            single("Swimmer", name),
            single("Age", "10"),
            single("Team", "VCOC"),
            single("Gender", "F"),
            single("Email", email),
            ItemResponse {
                question: "Events".into(),
                answer: Answer::Multiple(events.iter().map(|e| e.to_string()).collect()),
            },
        ],
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.split.settle_delay_ms = 0;
    config
}

#[test]
fn submission_is_recorded_split_and_confirmed() {
    println!("\n====== Testing form submission ======");
    let book = Mutex::new(Spreadsheet::new());
    let locks = SheetLocks::new();
    let notifier = RecordingNotifier::default();
    let config = config();

    let form = entry_form("Ann Lee", &["50 Free", "100 Back"], "ann@example.org");
    let receipt = mailer::handle_form_submit(&book, &locks, &config, SHEET, &form, &notifier).unwrap();

    assert_eq!(receipt.row, 2);
    assert_eq!(
        receipt.split,
        SplitOutcome::Completed(SplitReport {
            data_rows_before: 1,
            data_rows_after: 2,
            rows_split: 1,
        })
    );
    assert_eq!(receipt.emailed.as_deref(), Some("ann@example.org"));
    assert_eq!(receipt.warning, None);

    let book = book.lock();
    let sheet = book.sheet(SHEET).unwrap();
    assert_eq!(sheet.get_a1("A1").unwrap().to_string(), "Timestamp");
    assert_eq!(sheet.get_a1("G1").unwrap().to_string(), "Events");
    assert_eq!(sheet.get_a1("G2").unwrap().to_string(), "50 Free");
    assert_eq!(sheet.get_a1("G3").unwrap().to_string(), "100 Back");
    assert_eq!(sheet.get_a1("B3").unwrap().to_string(), "Ann Lee");
    println!("✓ Two entry rows written");

    let sent = notifier.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Your Form Submission Responses");
    assert!(sent[0].html_body.contains("<li><strong>Events</strong>: 50 Free, 100 Back</li>"));
}

#[test]
fn later_submissions_append_below() {
    let book = Mutex::new(Spreadsheet::new());
    let locks = SheetLocks::new();
    let notifier = RecordingNotifier::default();
    let config = config();

    let first = entry_form("Ann Lee", &["50 Free", "100 Back"], "ann@example.org");
    mailer::handle_form_submit(&book, &locks, &config, SHEET, &first, &notifier).unwrap();
    let second = entry_form("Bea Kim", &["200 IM"], "bea@example.org");
    let receipt = mailer::handle_form_submit(&book, &locks, &config, SHEET, &second, &notifier).unwrap();

    assert_eq!(receipt.row, 4);
    assert!(matches!(receipt.split, SplitOutcome::Completed(ref r) if r.rows_split == 0 && r.data_rows_after == 3));
    let book = book.lock();
    let sheet = book.sheet(SHEET).unwrap();
    assert_eq!(sheet.get_a1("B4").unwrap().to_string(), "Bea Kim");
    assert_eq!(sheet.last_row(), 4);
    assert_eq!(notifier.sent.lock().len(), 2);
}

#[test]
fn response_recorded_during_a_split_survives_it() {
    println!("\n====== Testing a submission racing a split ======");
    const ENTRIES: usize = 2000;
    let header = entry_form("", &[], "").header_row();
    let mut rows = vec![header];
    for i in 0..ENTRIES {
        let form = entry_form(&format!("Swimmer {}", i), &["50 Free", "100 Back"], "x@example.org");
        rows.push(form.to_row("10/18/2026 09:00:00"));
    }
    let mut book = Spreadsheet::new();
    book.add_sheet(Sheet::from_rows(SHEET, rows));
    let book = Arc::new(Mutex::new(book));
    let locks = SheetLocks::new();

    let handle = {
        let book = Arc::clone(&book);
        let locks = locks.clone();
        let splitter = RowSplitter::new(&config());
        thread::spawn(move || splitter.split_exclusive(&book, &locks, SHEET).unwrap())
    };
    while !locks.is_locked(SHEET) && !handle.is_finished() {
        thread::yield_now();
    }
    let late = entry_form("Late Lee", &["200 IM"], "late@example.org");
    let row = mailer::record_response(&book, &locks, SHEET, &late);

    let outcome = handle.join().unwrap();
    assert!(matches!(outcome, SplitOutcome::Completed(ref r) if r.rows_split == ENTRIES));

    let book = book.lock();
    let sheet = book.sheet(SHEET).unwrap();
    let late_rows: Vec<u32> = (2..=sheet.last_row())
        .filter(|&r| sheet.get(r, 2).to_string() == "Late Lee")
        .collect();
    assert_eq!(late_rows, [row]);
    assert_eq!(sheet.last_row() as usize, 2 * ENTRIES + 2);
    assert_eq!(sheet.get(row, 7).to_string(), "200 IM");
    println!("✓ Late submission kept at row {}", row);
}

#[test]
fn delivery_failure_is_only_a_warning() {
    let book = Mutex::new(Spreadsheet::new());
    let form = entry_form("Ann Lee", &["50 Free", "50 Fly"], "ann@example.org");

    let receipt =
        mailer::handle_form_submit(&book, &SheetLocks::new(), &config(), SHEET, &form, &FailingNotifier).unwrap();

    assert_eq!(receipt.emailed, None);
    assert_eq!(receipt.warning.as_deref(), Some("Notification failed: smtp down"));
    assert!(matches!(receipt.split, SplitOutcome::Completed(ref r) if r.rows_split == 1));
    println!("✓ Split kept despite failed e-mail");
}

#[test]
fn missing_address_skips_the_email() {
    let book = Mutex::new(Spreadsheet::new());
    let notifier = RecordingNotifier::default();
    let form = entry_form("Ann Lee", &["50 Free"], "not an address");

    let receipt = mailer::handle_form_submit(&book, &SheetLocks::new(), &config(), SHEET, &form, &notifier).unwrap();

    assert!(receipt.warning.unwrap().contains("Invalid or missing email address"));
    assert!(notifier.sent.lock().is_empty());
}

#[test]
fn respondent_email_wins_over_the_question() {
    let mut form = entry_form("Ann Lee", &["50 Free"], "");
    form.respondent_email = Some("parent@example.org".into());

    let email = ConfirmationEmail::from_response(&form, &config().mail).unwrap();
    assert_eq!(email.to, "parent@example.org");
}

#[test]
fn webhook_payload_deserializes() {
    let json = r#"{
        "items": [
            {"question": "Swimmer", "answer": "Ann Lee"},
            {"question": "Events", "answer": ["50 Free", "100 Back"]},
            {"question": "Email", "answer": "ann@example.org"}
        ]
    }"#;
    let form: FormResponse = serde_json::from_str(json).unwrap();

    assert_eq!(form.respondent_email, None);
    assert_eq!(form.items[1].answer.joined(), "50 Free, 100 Back");
    assert_eq!(form.email("Email").as_deref(), Some("ann@example.org"));
}
