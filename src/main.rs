#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

use prism_asset_engine::commands::{
    cancel_export_impl, cancel_scan_impl, copy_assets_to_clipboard_impl,
    detect_prism_roots_impl, get_asset_preview_impl, get_asset_record_impl,
    get_scan_status_impl, list_instances_impl, list_tree_children_impl,
    reconcile_asset_ids_impl, save_assets_impl, search_assets_impl, start_scan_impl,
    CopyAssetsRequest, CopyResult, SaveAssetsRequest, SaveResult, ScanStatusResponse,
    SearchAssetsRequest, SearchResponse, StartScanRequest, StartScanResponse,
};
use prism_asset_engine::model::{AssetRecord, ReconcileResult, TreeNode};
use prism_asset_engine::util::preview::Preview;
use prism_asset_engine::{AppError, SessionState};
use std::sync::Arc;
use tauri::State;

/// Launcher root autodetection.
#[tauri::command]
fn detect_prism_roots() -> Result<Vec<prism_asset_engine::util::launcher_detection::PrismRootCandidate>, AppError> {
    detect_prism_roots_impl()
}

/// Instance enumeration under a chosen Prism root.
#[tauri::command]
fn list_instances(prism_root: String) -> Result<Vec<prism_asset_engine::util::launcher_detection::InstanceInfo>, AppError> {
    list_instances_impl(prism_root)
}

/// Starts (or resumes from cache) a scan of one instance's assets. Returns
/// immediately; progress and completion arrive as `scan://*` events.
///
/// Async so the supersede-grace wait and cache lookup run on a blocking
/// thread via `spawn_blocking` rather than the webview's dispatch thread.
#[tauri::command]
async fn start_scan(
    request: StartScanRequest,
    window: tauri::Window,
    state: State<'_, Arc<SessionState>>,
) -> Result<StartScanResponse, AppError> {
    let state = state.inner().clone();
    tokio::task::spawn_blocking(move || start_scan_impl(request, window, state))
        .await
        .map_err(|e| AppError::state(format!("start_scan task join error: {}", e)))?
}

#[tauri::command]
fn cancel_scan(scan_id: String, state: State<Arc<SessionState>>) -> Result<(), AppError> {
    cancel_scan_impl(scan_id, &state)
}

#[tauri::command]
fn get_scan_status(scan_id: String, state: State<Arc<SessionState>>) -> Result<ScanStatusResponse, AppError> {
    get_scan_status_impl(scan_id, &state)
}

#[tauri::command]
fn list_tree_children(
    scan_id: String,
    node_id: Option<String>,
    state: State<Arc<SessionState>>,
) -> Result<Vec<TreeNode>, AppError> {
    list_tree_children_impl(scan_id, node_id, &state)
}

#[tauri::command]
fn search_assets(request: SearchAssetsRequest, state: State<Arc<SessionState>>) -> Result<SearchResponse, AppError> {
    search_assets_impl(request, &state)
}

#[tauri::command]
fn get_asset_record(scan_id: String, asset_id: String, state: State<Arc<SessionState>>) -> Result<AssetRecord, AppError> {
    get_asset_record_impl(scan_id, asset_id, &state)
}

#[tauri::command]
fn get_asset_preview(scan_id: String, asset_id: String, state: State<Arc<SessionState>>) -> Result<Preview, AppError> {
    get_asset_preview_impl(scan_id, asset_id, &state)
}

#[tauri::command]
fn reconcile_asset_ids(
    scan_id: String,
    asset_ids: Vec<String>,
    state: State<Arc<SessionState>>,
) -> Result<ReconcileResult, AppError> {
    reconcile_asset_ids_impl(scan_id, asset_ids, &state)
}

/// Writes the requested assets to disk. Returns immediately; progress and
/// completion arrive as `export://*` events.
#[tauri::command]
async fn save_assets(
    request: SaveAssetsRequest,
    window: tauri::Window,
    state: State<'_, Arc<SessionState>>,
) -> Result<SaveResult, AppError> {
    let state = state.inner().clone();
    tokio::task::spawn_blocking(move || save_assets_impl(request, window, state))
        .await
        .map_err(|e| AppError::state(format!("save_assets task join error: {}", e)))?
}

#[tauri::command]
async fn copy_assets_to_clipboard(
    request: CopyAssetsRequest,
    window: tauri::Window,
    state: State<'_, Arc<SessionState>>,
) -> Result<CopyResult, AppError> {
    let state = state.inner().clone();
    tokio::task::spawn_blocking(move || copy_assets_to_clipboard_impl(request, window, state))
        .await
        .map_err(|e| AppError::state(format!("copy_assets_to_clipboard task join error: {}", e)))?
}

#[tauri::command]
fn cancel_export(operation_id: String, state: State<Arc<SessionState>>) -> Result<(), AppError> {
    cancel_export_impl(operation_id, &state)
}

fn main() {
    env_logger::init();

    tauri::Builder::default()
        .plugin(tauri_plugin_clipboard_manager::init())
        .manage(Arc::new(SessionState::new()))
        .invoke_handler(tauri::generate_handler![
            detect_prism_roots,
            list_instances,
            start_scan,
            cancel_scan,
            get_scan_status,
            list_tree_children,
            search_assets,
            get_asset_record,
            get_asset_preview,
            reconcile_asset_ids,
            save_assets,
            copy_assets_to_clipboard,
            cancel_export,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
