/// Session state held by the command gateway.
///
/// There is exactly one of these, built once in `main.rs` and managed by
/// Tauri. Every command reaches scan/export state through it rather than
/// through module-level statics.
use crate::error::{AppError, AppResult};
use crate::model::{AssetRecord, ExportOperation, ScanState};
use crate::util::index::Index;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The inputs needed to re-run discovery for a scan's refresh sweep.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub prism_root: String,
    pub instance_path: String,
    pub include_vanilla: bool,
    pub include_mods: bool,
    pub include_resourcepacks: bool,
    pub cache_key: String,
}

#[derive(Default)]
pub struct SessionState {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    active_scan_id: Option<String>,
    scans_by_id: HashMap<String, Arc<Mutex<ScanState>>>,
    index: Option<Arc<Index>>,
    scan_contexts: HashMap<String, ScanContext>,
    stale_records_by_scan: HashMap<String, HashMap<String, AssetRecord>>,
    active_export_operation_id: Option<String>,
    export_running: bool,
    exports_by_id: HashMap<String, Arc<Mutex<ExportOperation>>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly started scan as the active one, returning the
    /// previously active scan's own state handle (if any) so the caller can
    /// request it stop and wait out a grace period before walking the new
    /// scan's containers.
    pub fn begin_scan(&self, state: ScanState) -> Option<Arc<Mutex<ScanState>>> {
        let mut inner = self.inner.lock().expect("session state mutex poisoned");
        let previous = inner
            .active_scan_id
            .as_ref()
            .and_then(|id| inner.scans_by_id.get(id))
            .cloned();
        let scan_id = state.scan_id.clone();
        inner
            .scans_by_id
            .insert(scan_id.clone(), Arc::new(Mutex::new(state)));
        inner.active_scan_id = Some(scan_id);
        previous
    }

    pub fn scan(&self, scan_id: &str) -> Option<Arc<Mutex<ScanState>>> {
        let inner = self.inner.lock().expect("session state mutex poisoned");
        inner.scans_by_id.get(scan_id).cloned()
    }

    pub fn active_scan_id(&self) -> Option<String> {
        let inner = self.inner.lock().expect("session state mutex poisoned");
        inner.active_scan_id.clone()
    }

    pub fn set_index(&self, index: Arc<Index>) {
        let mut inner = self.inner.lock().expect("session state mutex poisoned");
        inner.index = Some(index);
    }

    pub fn index(&self) -> Option<Arc<Index>> {
        let inner = self.inner.lock().expect("session state mutex poisoned");
        inner.index.clone()
    }

    pub fn set_scan_context(&self, scan_id: String, context: ScanContext) {
        let mut inner = self.inner.lock().expect("session state mutex poisoned");
        inner.scan_contexts.insert(scan_id, context);
    }

    pub fn scan_context(&self, scan_id: &str) -> Option<ScanContext> {
        let inner = self.inner.lock().expect("session state mutex poisoned");
        inner.scan_contexts.get(scan_id).cloned()
    }

    pub fn set_stale_records(&self, scan_id: String, records: HashMap<String, AssetRecord>) {
        let mut inner = self.inner.lock().expect("session state mutex poisoned");
        inner.stale_records_by_scan.insert(scan_id, records);
    }

    pub fn stale_records(&self, scan_id: &str) -> HashMap<String, AssetRecord> {
        let inner = self.inner.lock().expect("session state mutex poisoned");
        inner.stale_records_by_scan.get(scan_id).cloned().unwrap_or_default()
    }

    /// Registers `operation` as the active export, rejecting with
    /// `StateError` if one is already running — only one concurrent export
    /// is allowed per session.
    pub fn try_begin_export(&self, operation: ExportOperation) -> AppResult<()> {
        let mut inner = self.inner.lock().expect("session state mutex poisoned");
        if inner.export_running {
            return Err(AppError::state("an export is already in progress for this session"));
        }
        let operation_id = operation.operation_id.clone();
        inner
            .exports_by_id
            .insert(operation_id.clone(), Arc::new(Mutex::new(operation)));
        inner.active_export_operation_id = Some(operation_id);
        inner.export_running = true;
        Ok(())
    }

    /// Clears the running flag once an export reaches a terminal state,
    /// letting the next `save_assets`/`copy_assets_to_clipboard` proceed.
    pub fn finish_export(&self) {
        let mut inner = self.inner.lock().expect("session state mutex poisoned");
        inner.export_running = false;
    }

    pub fn export(&self, operation_id: &str) -> Option<Arc<Mutex<ExportOperation>>> {
        let inner = self.inner.lock().expect("session state mutex poisoned");
        inner.exports_by_id.get(operation_id).cloned()
    }

    pub fn active_export_operation_id(&self) -> Option<String> {
        let inner = self.inner.lock().expect("session state mutex poisoned");
        inner.active_export_operation_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExportKind;

    #[test]
    fn test_begin_scan_tracks_active_id() {
        let state = SessionState::new();
        let previous = state.begin_scan(ScanState::new("scan-1".into()));
        assert!(previous.is_none());
        assert_eq!(state.active_scan_id(), Some("scan-1".to_string()));
        assert!(state.scan("scan-1").is_some());
    }

    #[test]
    fn test_begin_scan_returns_previous_scan_handle() {
        let state = SessionState::new();
        state.begin_scan(ScanState::new("scan-1".into()));
        let previous = state.begin_scan(ScanState::new("scan-2".into()));
        assert!(previous.is_some());
        assert_eq!(
            previous.unwrap().lock().unwrap().scan_id,
            "scan-1".to_string()
        );
        assert_eq!(state.active_scan_id(), Some("scan-2".to_string()));
    }

    #[test]
    fn test_export_lookup_round_trip() {
        let state = SessionState::new();
        state
            .try_begin_export(ExportOperation::new("export-1".into(), ExportKind::Save))
            .unwrap();
        assert_eq!(
            state.active_export_operation_id(),
            Some("export-1".to_string())
        );
        assert!(state.export("export-1").is_some());
        assert!(state.export("nonexistent").is_none());
    }

    #[test]
    fn test_try_begin_export_rejects_second_concurrent_export() {
        let state = SessionState::new();
        state
            .try_begin_export(ExportOperation::new("export-1".into(), ExportKind::Save))
            .unwrap();
        let result = state.try_begin_export(ExportOperation::new("export-2".into(), ExportKind::Copy));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code, "StateError");
    }

    #[test]
    fn test_finish_export_allows_next_export() {
        let state = SessionState::new();
        state
            .try_begin_export(ExportOperation::new("export-1".into(), ExportKind::Save))
            .unwrap();
        state.finish_export();
        assert!(state
            .try_begin_export(ExportOperation::new("export-2".into(), ExportKind::Copy))
            .is_ok());
    }
}
