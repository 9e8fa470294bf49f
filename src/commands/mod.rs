/// Tauri command handlers, one module per command group.
pub mod browse;
pub mod export;
pub mod launcher;
pub mod scan;

pub use browse::{
    get_asset_preview_impl, get_asset_record_impl, list_tree_children_impl,
    reconcile_asset_ids_impl, search_assets_impl, SearchAssetsRequest, SearchResponse,
};
pub use export::{
    cancel_export_impl, copy_assets_to_clipboard_impl, save_assets_impl, CopyAssetsRequest,
    CopyResult, SaveAssetsRequest, SaveResult,
};
pub use launcher::{detect_prism_roots_impl, list_instances_impl};
pub use scan::{
    cancel_scan_impl, get_scan_status_impl, start_scan_impl, ScanStatusResponse,
    StartScanRequest, StartScanResponse,
};
