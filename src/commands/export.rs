/// Export commands: `save_assets`, `copy_assets_to_clipboard`,
/// `cancel_export`. Both export kinds share `export_executor::run_export`;
/// results stream back via `export://progress`/`export://completed` the same
/// way scan progress streams via `scan://*`.
use crate::error::{AppError, AppResult};
use crate::model::{AssetRecord, AudioFormat, ExportFailure, ExportKind, ExportOperation};
use crate::state::SessionState;
use crate::util::export_executor::{self, ExportDestination};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tauri::Emitter;
use tauri_plugin_clipboard_manager::ClipboardExt;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAssetsRequest {
    pub scan_id: String,
    pub asset_ids: Vec<String>,
    pub destination_dir: String,
    pub audio_format: AudioFormat,
    pub operation_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyAssetsRequest {
    pub scan_id: String,
    pub asset_ids: Vec<String>,
    pub audio_format: AudioFormat,
    pub operation_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    pub operation_id: String,
    pub started: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyResult {
    pub operation_id: String,
    pub started: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportProgressEvent {
    operation_id: String,
    processed_count: usize,
    success_count: usize,
    failed_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportCompletedEvent {
    operation_id: String,
    processed_count: usize,
    success_count: usize,
    failed_count: usize,
    cancelled: bool,
    failures: Vec<ExportFailure>,
}

/// Resolves `assetIds` against the scan's index, up front.
/// Unknown ids are returned as pre-seeded failures rather than silently
/// dropped, so `processedCount` still accounts for every requested id.
fn resolve_records(
    scan_id: &str,
    asset_ids: &[String],
    state: &SessionState,
) -> AppResult<(Vec<(String, AssetRecord)>, Vec<ExportFailure>)> {
    let index = state
        .index()
        .ok_or_else(|| AppError::state(format!("scan {} has no index yet", scan_id)))?;

    let mut resolved = Vec::new();
    let mut failures = Vec::new();
    for asset_id in asset_ids {
        match index.get(asset_id) {
            Some(record) => resolved.push((asset_id.clone(), record.clone())),
            None => failures.push(ExportFailure {
                asset_id: asset_id.clone(),
                key: String::new(),
                error: "unknown assetId".to_string(),
            }),
        }
    }
    Ok((resolved, failures))
}

/// `save_assets`: writes each asset under `destinationDir`.
pub fn save_assets_impl(
    request: SaveAssetsRequest,
    window: tauri::Window,
    state: Arc<SessionState>,
) -> AppResult<SaveResult> {
    validation::validate_asset_ids(&request.asset_ids)?;
    if request.destination_dir.is_empty() {
        return Err(AppError::config("destinationDir cannot be empty"));
    }
    std::fs::create_dir_all(&request.destination_dir)
        .map_err(|e| AppError::config(format!("cannot create {}: {}", request.destination_dir, e)))?;

    let (resolved, seed_failures) = resolve_records(&request.scan_id, &request.asset_ids, &state)?;
    let operation_id = request.operation_id.clone();
    state.try_begin_export(ExportOperation::new(operation_id.clone(), ExportKind::Save))?;

    let cancel = state
        .export(&operation_id)
        .expect("export just registered")
        .lock()
        .expect("export mutex poisoned")
        .cancel
        .clone();

    let destination_dir = request.destination_dir;
    let audio_format = request.audio_format;
    let run_state = state.clone();
    let run_operation_id = operation_id.clone();
    std::thread::spawn(move || {
        run_export_and_report(
            run_operation_id,
            resolved,
            seed_failures,
            ExportDestination::Save {
                destination_dir: std::path::Path::new(&destination_dir),
            },
            audio_format,
            cancel,
            window,
            run_state,
        );
    });

    Ok(SaveResult {
        operation_id,
        started: true,
    })
}

/// `copy_assets_to_clipboard`: stages assets to a scratch directory, then
/// hands the OS clipboard the staged file paths.
pub fn copy_assets_to_clipboard_impl(
    request: CopyAssetsRequest,
    window: tauri::Window,
    state: Arc<SessionState>,
) -> AppResult<CopyResult> {
    validation::validate_asset_ids(&request.asset_ids)?;

    let (resolved, seed_failures) = resolve_records(&request.scan_id, &request.asset_ids, &state)?;
    let operation_id = request.operation_id.clone();
    state.try_begin_export(ExportOperation::new(operation_id.clone(), ExportKind::Copy))?;

    let cancel = state
        .export(&operation_id)
        .expect("export just registered")
        .lock()
        .expect("export mutex poisoned")
        .cancel
        .clone();

    let audio_format = request.audio_format;
    let run_state = state.clone();
    let run_operation_id = operation_id.clone();
    std::thread::spawn(move || {
        run_export_and_report(
            run_operation_id,
            resolved,
            seed_failures,
            ExportDestination::Clipboard,
            audio_format,
            cancel,
            window,
            run_state,
        );
    });

    Ok(CopyResult {
        operation_id,
        started: true,
    })
}

fn run_export_and_report(
    operation_id: String,
    resolved: Vec<(String, AssetRecord)>,
    seed_failures: Vec<ExportFailure>,
    destination: ExportDestination,
    audio_format: AudioFormat,
    cancel: Arc<std::sync::atomic::AtomicBool>,
    window: tauri::Window,
    state: Arc<SessionState>,
) {
    let is_clipboard = matches!(destination, ExportDestination::Clipboard);
    let seed_failed = seed_failures.len();
    let progress_operation_id = operation_id.clone();
    let progress_state = state.clone();
    let progress_window = window.clone();

    let outcome = export_executor::run_export(&resolved, destination, audio_format, &cancel, move |processed, success, failed| {
        update_export_counters(
            &progress_operation_id,
            &progress_state,
            seed_failed + processed,
            success,
            seed_failed + failed,
        );
        emit_progress(
            &progress_window,
            &progress_operation_id,
            seed_failed + processed,
            success,
            seed_failed + failed,
        );
    });

    let outcome = match outcome {
        Ok(o) => o,
        Err(e) => {
            log::warn!("export {} failed to run: {}", operation_id, e);
            state.finish_export();
            return;
        }
    };

    if is_clipboard && !outcome.written_paths.is_empty() {
        let file_list = outcome
            .written_paths
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        if let Err(e) = window.app_handle().clipboard().write_text(file_list) {
            log::warn!("failed to write staged files to clipboard: {}", e);
        }
    }

    let mut failures = seed_failures;
    failures.extend(outcome.failures);
    let processed_count = seed_failed + outcome.processed_count;
    let success_count = outcome.success_count;
    let failed_count = seed_failed + outcome.failed_count;

    if let Some(export_state) = state.export(&operation_id) {
        let mut e = export_state.lock().expect("export mutex poisoned");
        e.processed_count = processed_count;
        e.success_count = success_count;
        e.failed_count = failed_count;
        e.failures = failures.clone();
    }

    let _ = window.emit(
        "export://completed",
        ExportCompletedEvent {
            operation_id,
            processed_count,
            success_count,
            failed_count,
            cancelled: outcome.cancelled,
            failures,
        },
    );
    state.finish_export();
}

fn update_export_counters(operation_id: &str, state: &SessionState, processed: usize, success: usize, failed: usize) {
    if let Some(export_state) = state.export(operation_id) {
        let mut e = export_state.lock().expect("export mutex poisoned");
        e.processed_count = processed;
        e.success_count = success;
        e.failed_count = failed;
    }
}

fn emit_progress(window: &tauri::Window, operation_id: &str, processed: usize, success: usize, failed: usize) {
    let _ = window.emit(
        "export://progress",
        ExportProgressEvent {
            operation_id: operation_id.to_string(),
            processed_count: processed,
            success_count: success,
            failed_count: failed,
        },
    );
}

/// `cancel_export`: sets the operation's cancellation flag; the in-flight
/// item finishes before the operation terminates.
pub fn cancel_export_impl(operation_id: String, state: &SessionState) -> AppResult<()> {
    let export_state = state
        .export(&operation_id)
        .ok_or_else(|| AppError::state(format!("unknown operationId: {}", operation_id)))?;
    export_state
        .lock()
        .expect("export mutex poisoned")
        .cancel
        .store(true, Ordering::SeqCst);
    Ok(())
}
