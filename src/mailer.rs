//! Entry form submissions: the response row, the split and the confirmation e-mail.

use crate::cell::CellValue;
use crate::config::{Config, MailConfig};
use crate::error::{HeatError, Result};
use crate::lock::SheetLocks;
use crate::splitter::{RowSplitter, SplitOutcome};
use crate::spreadsheet::Spreadsheet;
use chrono::Local;
use lazy_static::lazy_static;
use log::{error, info, warn};
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::thread;

#[cfg(feature = "web")]
use lettre::message::{Mailbox, MultiPart};
#[cfg(feature = "web")]
use lettre::transport::smtp::authentication::Credentials;
#[cfg(feature = "web")]
use lettre::transport::smtp::client::{Tls, TlsParameters};
#[cfg(feature = "web")]
use lettre::{Message, SmtpTransport, Transport};

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Environment variable holding the SMTP password.
pub const SMTP_PASSWORD_VAR: &str = "VCOC_SMTP_PASSWORD";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Answer {
    Single(String),
    /// Checkbox questions.
    Multiple(Vec<String>),
}

impl Answer {
    pub fn joined(&self) -> String {
        match self {
            Answer::Single(s) => s.clone(),
            Answer::Multiple(items) => items.join(", "),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ItemResponse {
    pub question: String,
    pub answer: Answer,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FormResponse {
    /// Set when the form collects the address itself.
    #[serde(default)]
    pub respondent_email: Option<String>,
    pub items: Vec<ItemResponse>,
}

impl FormResponse {
    pub fn email(&self, question: &str) -> Option<String> {
        self.respondent_email.clone().or_else(|| {
            self.items
                .iter()
                .find(|item| item.question == question)
                .map(|item| item.answer.joined().trim().to_string())
        })
    }

    pub fn header_row(&self) -> Vec<CellValue> {
        std::iter::once(CellValue::text("Timestamp"))
            .chain(self.items.iter().map(|item| CellValue::text(item.question.as_str())))
            .collect()
    }

    /// The row the response sheet records: timestamp, then one answer per question.
    pub fn to_row(&self, timestamp: &str) -> Vec<CellValue> {
        std::iter::once(CellValue::text(timestamp))
            .chain(self.items.iter().map(|item| CellValue::parse(&item.answer.joined())))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConfirmationEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

impl ConfirmationEmail {
    /// Builds the confirmation listing every question and answer.
    pub fn from_response(response: &FormResponse, mail: &MailConfig) -> Result<Self> {
        let to = response.email(&mail.email_question).unwrap_or_default();
        if !EMAIL.is_match(&to) {
            return Err(HeatError::InvalidEmail(to));
        }

        let mut html_body = String::from(
            "<h3>Thank You for Your Submission</h3>\n<p>Below are your form responses:</p>\n<ul>\n",
        );
        let mut text_body = String::from("Below are your form responses:\n\n");
        for item in &response.items {
            let answer = item.answer.joined();
            html_body.push_str(&format!(
                "<li><strong>{}</strong>: {}</li>\n",
                escape_html(&item.question),
                escape_html(&answer)
            ));
            text_body.push_str(&format!("{}: {}\n", item.question, answer));
        }
        html_body.push_str("</ul>");

        Ok(ConfirmationEmail {
            to,
            subject: mail.subject.clone(),
            html_body,
            text_body,
        })
    }
}

/// Delivers confirmation e-mails.
pub trait Notifier: Send + Sync {
    fn send(&self, email: &ConfirmationEmail) -> Result<()>;
}

#[cfg(feature = "web")]
pub struct SmtpMailer {
    smtp: SmtpTransport,
    from: String,
}

#[cfg(feature = "web")]
impl SmtpMailer {
    pub fn new(mail: &MailConfig) -> Result<Self> {
        let password = std::env::var(SMTP_PASSWORD_VAR).unwrap_or_default();
        let creds = Credentials::new(mail.username.clone(), password);

        let tls_parameters = TlsParameters::new(mail.smtp_host.clone())
            .map_err(|e| HeatError::Notify(e.to_string()))?;

        let smtp = SmtpTransport::relay(&mail.smtp_host)
            .map_err(|e| HeatError::Notify(e.to_string()))?
            .credentials(creds)
            .port(mail.smtp_port)
            .tls(Tls::Wrapper(tls_parameters))
            .build();

        Ok(SmtpMailer {
            smtp,
            from: mail.from.clone(),
        })
    }
}

#[cfg(feature = "web")]
impl Notifier for SmtpMailer {
    fn send(&self, email: &ConfirmationEmail) -> Result<()> {
        let notify = |e: &dyn std::fmt::Display| HeatError::Notify(e.to_string());
        let message = Message::builder()
            .from(self.from.parse::<Mailbox>().map_err(|e| notify(&e))?)
            .to(email.to.parse::<Mailbox>().map_err(|e| notify(&e))?)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                email.html_body.clone(),
            ))
            .map_err(|e| notify(&e))?;

        self.smtp.send(&message).map_err(|e| notify(&e))?;
        Ok(())
    }
}

/// What happened to one submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormReceipt {
    pub row: u32,
    pub split: SplitOutcome,
    pub emailed: Option<String>,
    /// Set when the confirmation could not be sent; the submission itself
    /// still succeeded.
    pub warning: Option<String>,
}

/// Appends the response to `sheet_name`, creating the sheet with a header
/// row on first use. Returns the row written.
///
/// Waits for any split running on the sheet; a submission is never dropped.
pub fn record_response(
    book: &Mutex<Spreadsheet>,
    locks: &SheetLocks,
    sheet_name: &str,
    response: &FormResponse,
) -> u32 {
    locks.run_blocking(sheet_name, || {
        let mut book = book.lock();
        let sheet = book.insert_sheet(sheet_name);
        if sheet.last_row() == 0 {
            sheet.set_values(1, 1, &[response.header_row()]);
        }
        let row = sheet.last_row() + 1;
        let timestamp = Local::now().format("%m/%d/%Y %H:%M:%S").to_string();
        sheet.set_values(row, 1, &[response.to_row(&timestamp)]);
        row
    })
}

/// Handles one form submission end to end.
///
/// The response is recorded, the sheet is split under its lock after the
/// settle delay, then the respondent is e-mailed. A missing address or a
/// delivery failure only sets `warning`.
pub fn handle_form_submit(
    book: &Mutex<Spreadsheet>,
    locks: &SheetLocks,
    config: &Config,
    sheet_name: &str,
    response: &FormResponse,
    notifier: &dyn Notifier,
) -> Result<FormReceipt> {
    if response.items.is_empty() {
        error!("no item responses in submission to '{}'", sheet_name);
    }
    let row = record_response(book, locks, sheet_name, response);
    info!("recorded submission to '{}' at row {}", sheet_name, row);

    thread::sleep(config.split.settle_delay());
    let split = RowSplitter::new(config).split_exclusive(book, locks, sheet_name)?;

    let (emailed, warning) = match ConfirmationEmail::from_response(response, &config.mail) {
        Err(e) => {
            error!("{}", e);
            (None, Some(e.to_string()))
        }
        Ok(email) => match notifier.send(&email) {
            Ok(()) => {
                info!("confirmation sent to {}", email.to);
                (Some(email.to), None)
            }
            Err(e) => {
                warn!("confirmation to {} failed: {}", email.to, e);
                (None, Some(e.to_string()))
            }
        },
    };

    Ok(FormReceipt {
        row,
        split,
        emailed,
        warning,
    })
}
