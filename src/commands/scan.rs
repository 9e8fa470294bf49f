/// Scan lifecycle commands: `start_scan`, `cancel_scan`, `get_scan_status`,
/// plus the background refresh sweep a cache hit kicks off.
use crate::config;
use crate::error::{AppError, AppResult};
use crate::model::{AssetRecord, Container, ContainerFingerprint, ScanLifecycle, ScanPhase, ScanState};
use crate::state::{ScanContext, SessionState};
use crate::util::{asset_extractor, discovery, index::Index, scan_cache, scan_orchestrator};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tauri::Emitter;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartScanRequest {
    pub prism_root: String,
    pub instance_folder: String,
    pub include_vanilla: bool,
    pub include_mods: bool,
    pub include_resourcepacks: bool,
    #[serde(default)]
    pub force_rescan: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartScanResponse {
    pub scan_id: String,
    pub cache_hit: bool,
    pub refresh_started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatusResponse {
    pub scan_id: String,
    pub lifecycle: ScanLifecycle,
    pub is_refreshing: bool,
    pub scanned_containers: usize,
    pub total_containers: usize,
    pub asset_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanProgressEvent {
    scan_id: String,
    phase: ScanPhase,
    scanned_containers: usize,
    total_containers: usize,
    asset_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanCompletedEvent {
    scan_id: String,
    lifecycle: ScanLifecycle,
    asset_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanErrorEvent {
    scan_id: String,
    message: String,
}

/// `start_scan`: supersedes any running scan for this session, then either
/// serves a cache hit (kicking off a background refresh sweep) or runs a
/// fresh scan over a bounded worker pool.
pub fn start_scan_impl(
    request: StartScanRequest,
    window: tauri::Window,
    state: Arc<SessionState>,
) -> AppResult<StartScanResponse> {
    validation::validate_source_selection(
        request.include_vanilla,
        request.include_mods,
        request.include_resourcepacks,
    )?;
    validation::validate_directory(&request.prism_root, "Prism root")?;

    let instance_path = std::path::Path::new(&request.prism_root)
        .join(&request.instance_folder)
        .to_string_lossy()
        .to_string();
    validation::validate_directory(&instance_path, "Instance folder")?;

    let cache_key = scan_cache::cache_key(
        &instance_path,
        request.include_vanilla,
        request.include_mods,
        request.include_resourcepacks,
    );
    let scan_id = uuid::Uuid::new_v4().to_string();

    if let Some(previous_scan) = state.begin_scan(ScanState::new(scan_id.clone())) {
        let previous_cancel = {
            previous_scan
                .lock()
                .expect("scan state mutex poisoned")
                .cancel
                .clone()
        };
        previous_cancel.store(true, Ordering::SeqCst);
        wait_for_supersede(&previous_scan, config::SUPERSEDE_GRACE);
    }

    let context = ScanContext {
        prism_root: request.prism_root.clone(),
        instance_path,
        include_vanilla: request.include_vanilla,
        include_mods: request.include_mods,
        include_resourcepacks: request.include_resourcepacks,
        cache_key: cache_key.clone(),
    };
    state.set_scan_context(scan_id.clone(), context.clone());

    if !request.force_rescan {
        if let Some(snapshot) = scan_cache::load(&cache_key) {
            return begin_cache_hit(scan_id, snapshot, context, window, state);
        }
    }

    begin_cache_miss(scan_id, context, window, state)
}

/// Blocks until the superseded scan reaches a terminal lifecycle or
/// `grace` elapses, whichever comes first, then returns regardless so a
/// slow-to-cancel scan can never wedge the next `start_scan` call.
fn wait_for_supersede(previous: &Arc<std::sync::Mutex<ScanState>>, grace: std::time::Duration) {
    let deadline = std::time::Instant::now() + grace;
    loop {
        let terminal = {
            let s = previous.lock().expect("scan state mutex poisoned");
            matches!(
                s.lifecycle,
                ScanLifecycle::Completed | ScanLifecycle::Cancelled | ScanLifecycle::Error
            )
        };
        if terminal || std::time::Instant::now() >= deadline {
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
}

fn begin_cache_hit(
    scan_id: String,
    snapshot: scan_cache::CacheSnapshot,
    context: ScanContext,
    window: tauri::Window,
    state: Arc<SessionState>,
) -> AppResult<StartScanResponse> {
    let records = snapshot.records;
    let fingerprints = snapshot.fingerprints;

    let stale_records: HashMap<String, AssetRecord> =
        records.iter().map(|r| (r.asset_id.clone(), r.clone())).collect();
    state.set_stale_records(scan_id.clone(), stale_records);

    let asset_count = records.len();
    state.set_index(Arc::new(Index::build(records.clone())));

    let cancel = {
        let scan_state = state.scan(&scan_id).expect("scan state just registered");
        let mut s = scan_state.lock().expect("scan state mutex poisoned");
        s.phase = ScanPhase::Refreshing;
        s.asset_count = asset_count;
        s.cancel.clone()
    };

    let refresh_scan_id = scan_id.clone();
    let refresh_state = state.clone();
    std::thread::spawn(move || {
        run_refresh_sweep(refresh_scan_id, context, records, fingerprints, cancel, window, refresh_state);
    });

    Ok(StartScanResponse {
        scan_id,
        cache_hit: true,
        refresh_started: true,
        refresh_mode: Some("incremental".to_string()),
    })
}

fn begin_cache_miss(
    scan_id: String,
    context: ScanContext,
    window: tauri::Window,
    state: Arc<SessionState>,
) -> AppResult<StartScanResponse> {
    let containers = match discovery::discover_containers(
        &context.prism_root,
        &context.instance_path,
        context.include_vanilla,
        context.include_mods,
        context.include_resourcepacks,
    ) {
        Ok(c) => c,
        Err(e) => {
            mark_scan_error(&scan_id, &e.to_string(), &state);
            return Err(e);
        }
    };

    let total = containers.len();
    let cancel = {
        let scan_state = state.scan(&scan_id).expect("scan state just registered");
        let mut s = scan_state.lock().expect("scan state mutex poisoned");
        s.phase = ScanPhase::Scanning;
        s.total_containers = total;
        s.cancel.clone()
    };

    let run_scan_id = scan_id.clone();
    let run_state = state.clone();
    let cache_key = context.cache_key.clone();
    std::thread::spawn(move || {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config::worker_pool_size())
            .build()
            .expect("failed to build scan worker pool");

        let progress_scan_id = run_scan_id.clone();
        let progress_state = run_state.clone();
        let progress_window = window.clone();
        let outcome = scan_orchestrator::run_scan(containers, &pool, cancel, move |snapshot| {
            update_scan_counters(
                &progress_scan_id,
                &progress_state,
                snapshot.scanned_containers,
                snapshot.total_containers,
                snapshot.asset_count,
            );
            emit_progress(
                &progress_window,
                &progress_scan_id,
                ScanPhase::Scanning,
                snapshot.scanned_containers,
                snapshot.total_containers,
                snapshot.asset_count,
            );
        });

        if outcome.cancelled {
            mark_scan_cancelled(&run_scan_id, &run_state);
            return;
        }

        let asset_count = outcome.records.len();
        if let Err(e) = scan_cache::store(&cache_key, &outcome.records, &outcome.fingerprints) {
            log::warn!("failed to persist scan cache: {}", e);
        }
        run_state.set_index(Arc::new(Index::build(outcome.records)));

        if let Some(scan_state) = run_state.scan(&run_scan_id) {
            let mut s = scan_state.lock().expect("scan state mutex poisoned");
            s.lifecycle = ScanLifecycle::Completed;
            s.asset_count = asset_count;
        }
        emit_completed(&window, &run_scan_id, ScanLifecycle::Completed, asset_count);
    });

    Ok(StartScanResponse {
        scan_id,
        cache_hit: false,
        refresh_started: false,
        refresh_mode: None,
    })
}

/// The refresh sweep kicked off after a cache hit: rerun discovery, reuse
/// records from fingerprint-unchanged containers, re-extract changed/new
/// ones, drop records whose container disappeared.
fn run_refresh_sweep(
    scan_id: String,
    context: ScanContext,
    old_records: Vec<AssetRecord>,
    old_fingerprints: HashMap<String, ContainerFingerprint>,
    cancel: Arc<AtomicBool>,
    window: tauri::Window,
    state: Arc<SessionState>,
) {
    let containers = match discovery::discover_containers(
        &context.prism_root,
        &context.instance_path,
        context.include_vanilla,
        context.include_mods,
        context.include_resourcepacks,
    ) {
        Ok(c) => c,
        Err(e) => {
            mark_scan_error(&scan_id, &e.to_string(), &state);
            emit_error(&window, &scan_id, &e.to_string());
            return;
        }
    };

    let mut old_by_container: HashMap<String, Vec<AssetRecord>> = HashMap::new();
    for record in old_records {
        old_by_container
            .entry(record.container_path.to_string_lossy().to_string())
            .or_default()
            .push(record);
    }

    let total = containers.len();
    let mut new_records = Vec::new();
    let mut new_fingerprints = HashMap::new();

    for (i, container) in containers.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            mark_scan_cancelled(&scan_id, &state);
            return;
        }

        let key = container.container_path.to_string_lossy().to_string();
        let unchanged = old_fingerprints
            .get(&key)
            .map(|old_fp| fingerprints_match(old_fp, &container.fingerprint))
            .unwrap_or(false);

        if unchanged {
            if let Some(existing) = old_by_container.get(&key) {
                new_records.extend(existing.iter().cloned());
            }
        } else {
            match reextract(container, &cancel) {
                Ok(records) => new_records.extend(records),
                Err(e) => log::warn!(
                    "refresh: container failed, skipping: {:?}: {}",
                    container.container_path,
                    e
                ),
            }
        }
        new_fingerprints.insert(key, container.fingerprint.clone());

        let scanned = i + 1;
        update_scan_counters(&scan_id, &state, scanned, total, new_records.len());
        emit_progress(&window, &scan_id, ScanPhase::Refreshing, scanned, total, new_records.len());
    }

    if cancel.load(Ordering::SeqCst) {
        mark_scan_cancelled(&scan_id, &state);
        return;
    }

    let asset_count = new_records.len();
    if let Err(e) = scan_cache::store(&context.cache_key, &new_records, &new_fingerprints) {
        log::warn!("failed to persist refreshed scan cache: {}", e);
    }
    state.set_index(Arc::new(Index::build(new_records)));

    if let Some(scan_state) = state.scan(&scan_id) {
        let mut s = scan_state.lock().expect("scan state mutex poisoned");
        s.lifecycle = ScanLifecycle::Completed;
        s.phase = ScanPhase::Scanning;
        s.asset_count = asset_count;
    }
    emit_completed(&window, &scan_id, ScanLifecycle::Completed, asset_count);
}

fn reextract(container: &Container, cancel: &Arc<AtomicBool>) -> anyhow::Result<Vec<AssetRecord>> {
    let reader = scan_orchestrator::open_reader(container)?;
    let result = asset_extractor::extract_container(container, &reader, cancel)?;
    Ok(result.records)
}

fn fingerprints_match(a: &ContainerFingerprint, b: &ContainerFingerprint) -> bool {
    a.size == b.size && a.modified_time_ns == b.modified_time_ns && a.content_hash == b.content_hash
}

fn mark_scan_error(scan_id: &str, message: &str, state: &SessionState) {
    if let Some(scan_state) = state.scan(scan_id) {
        let mut s = scan_state.lock().expect("scan state mutex poisoned");
        s.lifecycle = ScanLifecycle::Error;
        s.error = Some(message.to_string());
    }
}

fn mark_scan_cancelled(scan_id: &str, state: &SessionState) {
    if let Some(scan_state) = state.scan(scan_id) {
        let mut s = scan_state.lock().expect("scan state mutex poisoned");
        s.lifecycle = ScanLifecycle::Cancelled;
    }
}

fn update_scan_counters(scan_id: &str, state: &SessionState, scanned: usize, total: usize, asset_count: usize) {
    if let Some(scan_state) = state.scan(scan_id) {
        let mut s = scan_state.lock().expect("scan state mutex poisoned");
        s.scanned_containers = scanned;
        s.total_containers = total;
        s.asset_count = asset_count;
    }
}

fn emit_progress(window: &tauri::Window, scan_id: &str, phase: ScanPhase, scanned: usize, total: usize, asset_count: usize) {
    let _ = window.emit(
        "scan://progress",
        ScanProgressEvent {
            scan_id: scan_id.to_string(),
            phase,
            scanned_containers: scanned,
            total_containers: total,
            asset_count,
        },
    );
}

fn emit_completed(window: &tauri::Window, scan_id: &str, lifecycle: ScanLifecycle, asset_count: usize) {
    let _ = window.emit(
        "scan://completed",
        ScanCompletedEvent {
            scan_id: scan_id.to_string(),
            lifecycle,
            asset_count,
        },
    );
}

fn emit_error(window: &tauri::Window, scan_id: &str, message: &str) {
    let _ = window.emit(
        "scan://error",
        ScanErrorEvent {
            scan_id: scan_id.to_string(),
            message: message.to_string(),
        },
    );
}

/// `cancel_scan`: sets the scan's cancellation flag; the scan thread notices
/// it at the next per-container checkpoint.
pub fn cancel_scan_impl(scan_id: String, state: &SessionState) -> AppResult<()> {
    let scan_state = state
        .scan(&scan_id)
        .ok_or_else(|| AppError::state(format!("unknown scanId: {}", scan_id)))?;
    scan_state
        .lock()
        .expect("scan state mutex poisoned")
        .cancel
        .store(true, Ordering::SeqCst);
    Ok(())
}

/// `get_scan_status`: a synchronous snapshot of a scan's counters and phase.
pub fn get_scan_status_impl(scan_id: String, state: &SessionState) -> AppResult<ScanStatusResponse> {
    let scan_state = state
        .scan(&scan_id)
        .ok_or_else(|| AppError::state(format!("unknown scanId: {}", scan_id)))?;
    let s = scan_state.lock().expect("scan state mutex poisoned");
    Ok(ScanStatusResponse {
        scan_id: s.scan_id.clone(),
        lifecycle: s.lifecycle,
        is_refreshing: s.phase == ScanPhase::Refreshing,
        scanned_containers: s.scanned_containers,
        total_containers: s.total_containers,
        asset_count: s.asset_count,
        error: s.error.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_scan_unknown_id_is_state_error() {
        let state = SessionState::new();
        let result = cancel_scan_impl("nonexistent".to_string(), &state);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code, "StateError");
    }

    #[test]
    fn test_get_scan_status_reports_registered_scan() {
        let state = SessionState::new();
        state.begin_scan(ScanState::new("scan-1".into()));
        let status = get_scan_status_impl("scan-1".to_string(), &state).unwrap();
        assert_eq!(status.scan_id, "scan-1");
        assert_eq!(status.lifecycle, ScanLifecycle::Scanning);
    }

    #[test]
    fn test_wait_for_supersede_returns_early_once_terminal() {
        let scan = Arc::new(std::sync::Mutex::new(ScanState::new("scan-1".into())));
        scan.lock().unwrap().lifecycle = ScanLifecycle::Cancelled;
        let start = std::time::Instant::now();
        wait_for_supersede(&scan, std::time::Duration::from_secs(5));
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_wait_for_supersede_times_out_when_never_terminal() {
        let scan = Arc::new(std::sync::Mutex::new(ScanState::new("scan-1".into())));
        let start = std::time::Instant::now();
        wait_for_supersede(&scan, std::time::Duration::from_millis(50));
        assert!(start.elapsed() >= std::time::Duration::from_millis(50));
    }

    #[test]
    fn test_fingerprints_match_compares_size_and_hash() {
        let a = ContainerFingerprint {
            container_path: "/a".into(),
            container_type: crate::model::ContainerType::Directory,
            size: 10,
            modified_time_ns: 0,
            content_hash: Some("abc".into()),
        };
        let mut b = a.clone();
        assert!(fingerprints_match(&a, &b));
        b.content_hash = Some("different".into());
        assert!(!fingerprints_match(&a, &b));
    }
}
