#![cfg(not(tarpaulin_include))]

use clap::{Parser, Subcommand};
use env_logger::Env;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::process::ExitCode;
use vcoc::commands::{Command, CommandRunner, Reply, Selection};
use vcoc::config::Config;
use vcoc::job::FileJobStore;
use vcoc::lock::SheetLocks;
use vcoc::{downloader, loader, saving};

#[derive(Parser)]
#[command(name = "vcoc")]
#[command(about = "Virtual Clerk of Course: heat-sheet tools for swim meets")]
#[command(version)]
struct Cli {
    #[arg(long, global = true, default_value = "meet.bin.gz", help = "Workbook file (.bin.gz)")]
    workbook: PathBuf,
    #[arg(long, global = true, help = "JSON configuration file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand)]
enum Action {
    #[command(about = "Import a CSV or Excel file into the workbook")]
    Import { path: PathBuf },
    #[command(about = "Export one sheet as CSV, or the whole workbook as .xlsx")]
    Export {
        output: PathBuf,
        #[arg(long, help = "Sheet to export as CSV")]
        sheet: Option<String>,
    },
    #[command(about = "List the sheets of the workbook")]
    Sheets,
    #[command(about = "Rerank every section of an event sheet")]
    Rerank { sheet: String },
    #[command(about = "Scratch the swimmer on a row")]
    Scratch { sheet: String, row: u32 },
    #[command(about = "Record an intent to scratch")]
    Intent {
        sheet: String,
        row: u32,
        #[arg(help = "The swimmer's last event number")]
        last_event: String,
    },
    #[command(about = "Remove a scratch")]
    Unscratch { sheet: String, row: u32 },
    #[command(about = "Mark a swimmer as protected (16 & under)")]
    Protect { sheet: String, row: u32 },
    #[command(about = "Mark a swimmer as Top 8 or Top 16")]
    Top {
        sheet: String,
        row: u32,
        #[arg(default_value_t = 8)]
        places: u32,
    },
    #[command(about = "Draw a heat line under a row")]
    HeatLine { sheet: String, row: u32 },
    #[command(about = "Remove every heat line from a sheet")]
    ClearHeatLines { sheet: String },
    #[command(about = "Split comma-separated entries into one row each")]
    Split { sheet: String },
    #[command(about = "Tidy an imported results sheet and rank it")]
    Cleanup {
        sheet: String,
        #[arg(long, help = "Rename the sheet to 'Event <n>' first")]
        event: Option<String>,
    },
    #[command(about = "Create one sheet per event from the source sheet")]
    BreakOut { lanes: i64 },
    #[command(about = "Delete every sheet except the source sheet")]
    DeleteAllExceptSource,
    #[command(about = "Refresh the summary table on every event sheet")]
    UpdateSummaries { lanes: i64 },
    #[command(about = "Write the announced and closing time on a sheet")]
    Announce { sheet: String, time: String },
    #[command(about = "Show the VCoC version banner")]
    About,
}

impl Action {
    fn into_command(self) -> Option<(Command, Selection)> {
        let at = |sheet: String, row: u32| Selection::new(sheet, row);
        Some(match self {
            Action::Rerank { sheet } => (Command::RerankSwimmers, at(sheet, 0)),
            Action::Scratch { sheet, row } => (Command::ScratchSwimmer, at(sheet, row)),
            Action::Intent { sheet, row, last_event } => {
                (Command::IntentToScratch { last_event }, at(sheet, row))
            }
            Action::Unscratch { sheet, row } => (Command::UnscratchSwimmer, at(sheet, row)),
            Action::Protect { sheet, row } => (Command::ProtectSwimmer, at(sheet, row)),
            Action::Top { sheet, row, places } => (Command::MarkTop { places }, at(sheet, row)),
            Action::HeatLine { sheet, row } => (Command::DrawHeatLine, at(sheet, row)),
            Action::ClearHeatLines { sheet } => (Command::RemoveAllHeatLines, at(sheet, 0)),
            Action::Split { sheet } => (Command::SplitEvents, at(sheet, 0)),
            Action::Cleanup { sheet, event } => {
                (Command::CleanupImportedSheet { event_number: event }, at(sheet, 0))
            }
            Action::BreakOut { lanes } => {
                (Command::BreakOutByEvent { lanes }, Selection::default())
            }
            Action::DeleteAllExceptSource => (Command::DeleteAllExceptSource, Selection::default()),
            Action::UpdateSummaries { lanes } => {
                (Command::UpdateAllSummaryTables { lanes }, Selection::default())
            }
            Action::Announce { sheet, time } => (Command::AnnouncedTime { time }, at(sheet, 0)),
            Action::About => (Command::ShowVersion, Selection::default()),
            Action::Import { .. } | Action::Export { .. } | Action::Sheets => return None,
        })
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let mut book = saving::load_or_default(&cli.workbook)?;

    match cli.command {
        Action::Import { path } => {
            let name = loader::import_file(&mut book, &path)?;
            saving::save_spreadsheet(&book, &cli.workbook)?;
            println!("Imported '{}'", name);
        }
        Action::Export { output, sheet: Some(sheet) } => {
            std::fs::write(&output, downloader::to_csv(book.sheet(&sheet)?))?;
            println!("Wrote {}", output.display());
        }
        #[cfg(feature = "xlsx")]
        Action::Export { output, sheet: None } => {
            std::fs::write(&output, downloader::to_xlsx(&book)?)?;
            println!("Wrote {}", output.display());
        }
        #[cfg(not(feature = "xlsx"))]
        Action::Export { sheet: None, .. } => {
            eprintln!(
                "Exporting the whole workbook requires the 'xlsx' feature; pass --sheet for CSV"
            );
            return Ok(ExitCode::FAILURE);
        }
        Action::Sheets => {
            for name in book.sheet_names() {
                println!("{}", name);
            }
        }
        action => {
            let Some((command, selection)) = action.into_command() else {
                return Ok(ExitCode::SUCCESS);
            };
            let locks = SheetLocks::new();
            let store = FileJobStore::new(&config.job.store_dir);
            let runner = CommandRunner::new(&config, &locks, &store)?;
            let book = Mutex::new(book);

            match runner.execute(&book, &command, &selection) {
                Reply::Done(message) => {
                    saving::save_spreadsheet(&book.lock(), &cli.workbook)?;
                    println!("{}", message);
                }
                Reply::Alert(message) => {
                    eprintln!("{}", message);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
