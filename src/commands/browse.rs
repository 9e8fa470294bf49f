/// Index browsing commands: tree navigation, search, single-record lookup,
/// preview bytes, and post-refresh id reconciliation.
use crate::error::{AppError, AppResult};
use crate::model::{AssetRecord, ReconcileResult, TreeNode};
use crate::state::SessionState;
use crate::util::index::SearchFilter;
use crate::util::preview::{self, Preview};
use crate::validation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub total: usize,
    pub assets: Vec<AssetRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAssetsRequest {
    pub scan_id: String,
    pub query: String,
    #[serde(default)]
    pub folder_node_id: Option<String>,
    pub offset: usize,
    pub limit: usize,
    pub include_images: bool,
    pub include_audio: bool,
    pub include_other: bool,
}

fn active_index(scan_id: &str, state: &SessionState) -> AppResult<std::sync::Arc<crate::util::index::Index>> {
    if state.scan(scan_id).is_none() {
        return Err(AppError::state(format!("unknown scanId: {}", scan_id)));
    }
    state
        .index()
        .ok_or_else(|| AppError::state(format!("scan {} has no index yet", scan_id)))
}

/// `list_tree_children`: direct children of `nodeId` (root = `""`/absent).
pub fn list_tree_children_impl(
    scan_id: String,
    node_id: Option<String>,
    state: &SessionState,
) -> AppResult<Vec<TreeNode>> {
    let index = active_index(&scan_id, state)?;
    Ok(index.tree(node_id.as_deref().unwrap_or("")))
}

/// `search_assets`: paginated, kind-filtered, folder-scoped substring search.
pub fn search_assets_impl(request: SearchAssetsRequest, state: &SessionState) -> AppResult<SearchResponse> {
    let index = active_index(&request.scan_id, state)?;
    let filter = SearchFilter {
        include_images: request.include_images,
        include_audio: request.include_audio,
        include_other: request.include_other,
    };
    let (total, page) = index.search(
        &request.query,
        request.folder_node_id.as_deref(),
        &filter,
        request.offset,
        request.limit,
    );
    Ok(SearchResponse {
        total,
        assets: page.into_iter().cloned().collect(),
    })
}

/// `get_asset_record`: a single indexed record by id.
pub fn get_asset_record_impl(scan_id: String, asset_id: String, state: &SessionState) -> AppResult<AssetRecord> {
    let index = active_index(&scan_id, state)?;
    index
        .get(&asset_id)
        .cloned()
        .ok_or_else(|| AppError::state(format!("unknown assetId: {}", asset_id)))
}

/// `get_asset_preview`: base64 bytes for an indexed asset, subject to the
/// size cap.
pub fn get_asset_preview_impl(scan_id: String, asset_id: String, state: &SessionState) -> AppResult<Preview> {
    let index = active_index(&scan_id, state)?;
    let record = index
        .get(&asset_id)
        .ok_or_else(|| AppError::state(format!("unknown assetId: {}", asset_id)))?;
    preview::build_preview(record)
}

/// `reconcile_asset_ids`: maps ids that survived a refresh to themselves,
/// structurally rematches ids whose container was repacked, and reports the
/// rest as unknown.
pub fn reconcile_asset_ids_impl(
    scan_id: String,
    asset_ids: Vec<String>,
    state: &SessionState,
) -> AppResult<ReconcileResult> {
    validation::validate_asset_ids(&asset_ids)?;
    let index = active_index(&scan_id, state)?;
    let stale_records = state.stale_records(&scan_id);
    Ok(index.reconcile_asset_ids(&asset_ids, &stale_records))
}
