//! Resumable refresh of every event sheet's summary table.
//!
//! A refresh runs in slices. When a slice exceeds its time budget the cursor
//! is persisted through a [`JobStore`] and the next slice picks up from it,
//! so a large meet never has to be refreshed inside one call.

use crate::config::Config;
use crate::error::{HeatError, Result};
use crate::spreadsheet::Spreadsheet;
use crate::summary::SummaryTablePlacer;
use chrono::{DateTime, Utc};
use log::{error, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SummaryRefreshJob {
    pub id: Uuid,
    pub num_lanes: i64,
    /// Index into the eligible sheets of the next sheet to refresh.
    pub cursor: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SummaryRefreshJob {
    pub fn new(num_lanes: i64) -> Self {
        let now = Utc::now();
        SummaryRefreshJob {
            id: Uuid::new_v4(),
            num_lanes,
            cursor: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SliceOutcome {
    Paused { cursor: usize, updated: usize },
    Completed { updated: usize },
}

/// Where an unfinished refresh is kept between slices.
pub trait JobStore {
    /// The most recently updated unfinished job, if any.
    fn pending(&self) -> Result<Option<SummaryRefreshJob>>;
    fn save(&self, job: &SummaryRefreshJob) -> Result<()>;
    fn remove(&self, id: &Uuid) -> Result<()>;
}

/// One JSON file per job under a directory.
pub struct FileJobStore {
    dir: PathBuf,
}

impl FileJobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileJobStore { dir: dir.into() }
    }

    fn path_for(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl JobStore for FileJobStore {
    fn pending(&self) -> Result<Option<SummaryRefreshJob>> {
        if !self.dir.exists() {
            return Ok(None);
        }
        let mut latest: Option<SummaryRefreshJob> = None;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let job: SummaryRefreshJob = serde_json::from_str(&fs::read_to_string(&path)?)?;
            if latest.as_ref().is_none_or(|l| job.updated_at > l.updated_at) {
                latest = Some(job);
            }
        }
        Ok(latest)
    }

    fn save(&self, job: &SummaryRefreshJob) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(&job.id), serde_json::to_string_pretty(job)?)?;
        Ok(())
    }

    fn remove(&self, id: &Uuid) -> Result<()> {
        let path = self.path_for(id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<Uuid, SummaryRefreshJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        MemoryJobStore::default()
    }
}

impl JobStore for MemoryJobStore {
    fn pending(&self) -> Result<Option<SummaryRefreshJob>> {
        Ok(self
            .jobs
            .lock()
            .values()
            .max_by_key(|job| job.updated_at)
            .cloned())
    }

    fn save(&self, job: &SummaryRefreshJob) -> Result<()> {
        self.jobs.lock().insert(job.id, job.clone());
        Ok(())
    }

    fn remove(&self, id: &Uuid) -> Result<()> {
        self.jobs.lock().remove(id);
        Ok(())
    }
}

/// Runs slices of a summary refresh against a workbook.
pub struct SummaryRefresh<'a> {
    config: &'a Config,
    store: &'a dyn JobStore,
    placer: SummaryTablePlacer,
}

impl<'a> SummaryRefresh<'a> {
    pub fn new(config: &'a Config, store: &'a dyn JobStore) -> Self {
        SummaryRefresh {
            config,
            store,
            placer: SummaryTablePlacer::new(config),
        }
    }

    /// Resumes the pending job if there is one, otherwise starts a new one.
    /// Either way the job refreshes with `num_lanes`.
    pub fn begin(&self, num_lanes: i64) -> Result<SummaryRefreshJob> {
        self.placer.validate_lanes(num_lanes)?;
        match self.store.pending()? {
            Some(mut job) => {
                info!("resuming summary refresh {} at sheet {}", job.id, job.cursor);
                job.num_lanes = num_lanes;
                Ok(job)
            }
            None => Ok(SummaryRefreshJob::new(num_lanes)),
        }
    }

    fn eligible(&self, book: &Spreadsheet) -> Result<Vec<String>> {
        let names: Vec<String> = book
            .sheet_names()
            .into_iter()
            .filter(|name| *name != self.config.source_sheet_name)
            .collect();
        if names.is_empty() {
            error!("no sheets to update besides '{}'", self.config.source_sheet_name);
            return Err(HeatError::NothingToUpdate);
        }
        if names.len() > self.config.job.max_sheets {
            error!("too many sheets to update: {}", names.len());
            return Err(HeatError::TooManySheets(names.len()));
        }
        Ok(names)
    }

    /// Refreshes sheets from the job's cursor until done or over `budget`.
    ///
    /// At least one sheet is refreshed per slice. A paused job is saved to
    /// the store; a finished one is removed from it.
    pub fn run_slice(
        &self,
        book: &mut Spreadsheet,
        job: &mut SummaryRefreshJob,
        budget: Duration,
    ) -> Result<SliceOutcome> {
        let started = Instant::now();
        let names = self.eligible(book)?;
        let mut updated = 0;

        while job.cursor < names.len() {
            let name = &names[job.cursor];
            info!("updating summary table for sheet: {}", name);
            self.placer.place(book.sheet_mut(name)?, job.num_lanes)?;
            job.cursor += 1;
            updated += 1;

            if job.cursor < names.len() && started.elapsed() > budget {
                job.updated_at = Utc::now();
                self.store.save(job)?;
                info!(
                    "paused summary refresh {} at sheet {} ({})",
                    job.id, job.cursor, names[job.cursor]
                );
                return Ok(SliceOutcome::Paused {
                    cursor: job.cursor,
                    updated,
                });
            }
        }

        self.store.remove(&job.id)?;
        info!(
            "summary refresh {} completed in {:.1} seconds",
            job.id,
            started.elapsed().as_secs_f64()
        );
        Ok(SliceOutcome::Completed { updated })
    }
}

/// Drives a refresh to completion, one slice after another.
pub struct JobScheduler<'a> {
    refresh: SummaryRefresh<'a>,
    budget: Duration,
}

impl<'a> JobScheduler<'a> {
    pub fn new(config: &'a Config, store: &'a dyn JobStore) -> Self {
        JobScheduler {
            refresh: SummaryRefresh::new(config, store),
            budget: config.job.slice_budget(),
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Returns the number of sheets refreshed across all slices.
    pub fn drive(&self, book: &mut Spreadsheet, num_lanes: i64) -> Result<usize> {
        let mut job = self.refresh.begin(num_lanes)?;
        let mut total = 0;
        loop {
            match self.refresh.run_slice(book, &mut job, self.budget)? {
                SliceOutcome::Paused { updated, .. } => total += updated,
                SliceOutcome::Completed { updated } => return Ok(total + updated),
            }
        }
    }
}
