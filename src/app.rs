use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::commands::{Command, CommandRunner, Reply, Selection};
use crate::config::Config;
use crate::downloader;
use crate::error::HeatError;
use crate::job::FileJobStore;
use crate::lock::SheetLocks;
use crate::mailer::{self, FormResponse, Notifier, SmtpMailer};
use crate::saving;
use crate::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;

pub struct AppState {
    book: Mutex<Spreadsheet>,
    locks: SheetLocks,
    config: Config,
    store: FileJobStore,
    notifier: Box<dyn Notifier>,
    workbook_path: PathBuf,
}

impl AppState {
    pub fn new(
        book: Spreadsheet,
        config: Config,
        notifier: Box<dyn Notifier>,
        workbook_path: impl Into<PathBuf>,
    ) -> Self {
        AppState {
            book: Mutex::new(book),
            locks: SheetLocks::new(),
            store: FileJobStore::new(&config.job.store_dir),
            config,
            notifier,
            workbook_path: workbook_path.into(),
        }
    }
}

#[derive(Deserialize)]
struct CommandRequest {
    #[serde(flatten)]
    command: Command,
    #[serde(default)]
    selection: Selection,
}

#[derive(Deserialize)]
struct SaveQuery {
    filename: Option<String>,
}

#[derive(Serialize)]
struct SaveResponse {
    status: String,
    message: Option<String>,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(SaveResponse {
            status: "error".to_string(),
            message: Some(message),
        }),
    )
        .into_response()
}

fn status_for(e: &HeatError) -> StatusCode {
    match e {
        HeatError::SheetNotFound(_) => StatusCode::NOT_FOUND,
        HeatError::Io(_) | HeatError::Encode(_) | HeatError::Export(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/forms/:sheet/submit", post(submit_form))
        .route("/api/commands", post(run_command))
        .route("/api/sheets", get(list_sheets))
        .route("/api/sheets/:name", get(get_sheet_data))
        .route("/api/save", post(save_workbook))
        .route("/api/export", get(export_workbook))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(
    config: Config,
    workbook_path: PathBuf,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let book = saving::load_or_default(&workbook_path)?;
    let notifier = SmtpMailer::new(&config.mail)?;
    let state = Arc::new(AppState::new(book, config, Box::new(notifier), workbook_path));

    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn submit_form(
    Path(sheet): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(response): Json<FormResponse>,
) -> Response {
    let task = tokio::task::spawn_blocking(move || {
        mailer::handle_form_submit(
            &state.book,
            &state.locks,
            &state.config,
            &sheet,
            &response,
            state.notifier.as_ref(),
        )
    });

    match task.await {
        Ok(Ok(receipt)) => Json(receipt).into_response(),
        Ok(Err(e)) => {
            error!("form submission failed: {}", e);
            error_response(status_for(&e), e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn run_command(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommandRequest>,
) -> Response {
    let task = tokio::task::spawn_blocking(move || -> Result<Reply, HeatError> {
        let runner = CommandRunner::new(&state.config, &state.locks, &state.store)?;
        Ok(runner.execute(&state.book, &request.command, &request.selection))
    });

    match task.await {
        Ok(Ok(reply)) => Json(reply).into_response(),
        Ok(Err(e)) => error_response(status_for(&e), e.to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn list_sheets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.book.lock().sheet_names())
}

async fn get_sheet_data(Path(name): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let book = state.book.lock();
    let sheet = match book.sheet(&name) {
        Ok(sheet) => sheet,
        Err(e) => return error_response(StatusCode::NOT_FOUND, e.to_string()),
    };

    let mut cell_data = Vec::new();
    for r in 1..=sheet.last_row() {
        for c in 1..=sheet.last_column() {
            let Some(cell) = sheet.cell(r, c) else { continue };
            if cell.value.is_blank() && cell.background.is_none() {
                continue;
            }
            cell_data.push(serde_json::json!({
                "row": r,
                "col": c,
                "name": Sheet::get_cell_name(r, c),
                "value": cell.value.to_string(),
                "background": cell.background,
                "bold": cell.bold,
                "border": cell.border,
            }));
        }
    }

    Json(serde_json::json!({
        "name": sheet.name(),
        "rows": sheet.last_row(),
        "cols": sheet.last_column(),
        "cells": cell_data,
    }))
    .into_response()
}

/// Where a save goes: the workbook itself, or a bare file name placed next to it.
fn save_target(workbook_path: &Path, filename: Option<&str>) -> Result<PathBuf, HeatError> {
    let name = match filename {
        None => return Ok(workbook_path.to_path_buf()),
        Some(name) => name.trim(),
    };
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(HeatError::InvalidFileName(name.to_string()));
    }
    let dir = workbook_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(name))
}

async fn save_workbook(
    Query(params): Query<SaveQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let path = match save_target(&state.workbook_path, params.filename.as_deref()) {
        Ok(path) => path,
        Err(e) => return error_response(status_for(&e), e.to_string()),
    };
    let book = state.book.lock();

    match saving::save_spreadsheet(&book, &path) {
        Ok(()) => Json(SaveResponse {
            status: "ok".to_string(),
            message: Some(path.display().to_string()),
        })
        .into_response(),
        Err(e) => error_response(status_for(&e), e.to_string()),
    }
}

async fn export_workbook(State(state): State<Arc<AppState>>) -> Response {
    let exported = downloader::to_xlsx(&state.book.lock());
    match exported {
        Ok(buffer) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            )],
            Body::from(Bytes::from(buffer)),
        )
            .into_response(),
        Err(e) => error_response(status_for(&e), e.to_string()),
    }
}
