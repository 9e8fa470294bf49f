use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Physical form a [`Container`] is read through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerType {
    Directory,
    Zip,
    Jar,
    AssetIndex,
}

/// Which of the three container families an asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    Vanilla,
    Mod,
    ResourcePack,
}

impl SourceType {
    /// The segment a [`crate::util::index::Index`] tree root uses for this source.
    pub fn root_segment(self) -> &'static str {
        match self {
            SourceType::Vanilla => "vanilla",
            SourceType::Mod => "mods",
            SourceType::ResourcePack => "resourcepacks",
        }
    }
}

/// Cheap invalidation key for one container, captured at extraction time.
///
/// For directories this is `(path, hash of sorted (entryPath, size, mtime) list)`;
/// `content_hash` is only populated when mtime is absent or zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerFingerprint {
    pub container_path: String,
    pub container_type: ContainerType,
    pub size: u64,
    pub modified_time_ns: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// A scannable unit: a vanilla asset index, a mod jar/zip, or a resource pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub container_path: PathBuf,
    pub container_type: ContainerType,
    pub source_type: SourceType,
    pub source_name: String,
    pub fingerprint: ContainerFingerprint,
}

/// One indexed file inside a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub asset_id: String,
    pub key: String,
    pub key_lower: String,
    pub source_type: SourceType,
    pub source_name: String,
    pub namespace: String,
    pub relative_asset_path: String,
    pub extension: String,
    pub is_image: bool,
    pub is_audio: bool,
    pub container_path: PathBuf,
    pub container_type: ContainerType,
    pub entry_path: String,
}

impl AssetRecord {
    /// The dotted path used to place this record in the virtual folder tree:
    /// `<sourceRootSegment>/<sourceName>/<namespace>/<relativeAssetPath segments...>`.
    pub fn tree_path_segments(&self) -> Vec<&str> {
        let mut segments = vec![self.source_type.root_segment(), self.source_name.as_str(), self.namespace.as_str()];
        segments.extend(self.relative_asset_path.split('/').filter(|s| !s.is_empty()));
        segments
    }
}

/// `idle → estimating → scanning → (completed | cancelled | error)`, with an
/// optional concurrent `refreshing` sub-phase while serving cached results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanLifecycle {
    Scanning,
    Completed,
    Cancelled,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanPhase {
    Estimating,
    Scanning,
    Refreshing,
}

/// Per-scan mutable state. Lives in [`crate::state::SessionState`] behind an
/// `Arc`; counters are plain fields guarded by the session mutex rather than
/// atomics, since every mutation already happens on the owning scan thread
/// under that lock.
#[derive(Debug, Clone)]
pub struct ScanState {
    pub scan_id: String,
    pub lifecycle: ScanLifecycle,
    pub phase: ScanPhase,
    pub total_containers: usize,
    pub scanned_containers: usize,
    pub asset_count: usize,
    pub cancel: Arc<AtomicBool>,
    pub error: Option<String>,
}

impl ScanState {
    pub fn new(scan_id: String) -> Self {
        Self {
            scan_id,
            lifecycle: ScanLifecycle::Scanning,
            phase: ScanPhase::Estimating,
            total_containers: 0,
            scanned_containers: 0,
            asset_count: 0,
            cancel: Arc::new(AtomicBool::new(false)),
            error: None,
        }
    }
}

/// Virtual folder/file node. Computed lazily from the index, never stored
/// densely; tree nodes are reconstructed from the flat index on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    pub node_type: TreeNodeType,
    pub has_children: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TreeNodeType {
    Folder,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportKind {
    Save,
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Original,
    Mp3,
    Wav,
}

/// One failed item in an export operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFailure {
    pub asset_id: String,
    pub key: String,
    pub error: String,
}

/// Per-operation mutable state for `save_assets`/`copy_assets_to_clipboard`.
#[derive(Debug, Clone)]
pub struct ExportOperation {
    pub operation_id: String,
    pub kind: ExportKind,
    pub processed_count: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub cancel: Arc<AtomicBool>,
    pub failures: Vec<ExportFailure>,
}

impl ExportOperation {
    pub fn new(operation_id: String, kind: ExportKind) -> Self {
        Self {
            operation_id,
            kind,
            processed_count: 0,
            success_count: 0,
            failed_count: 0,
            cancel: Arc::new(AtomicBool::new(false)),
            failures: Vec::new(),
        }
    }
}

/// Result of `reconcile_asset_ids`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    pub id_map: HashMap<String, String>,
    pub unknown_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_path_segments() {
        let record = AssetRecord {
            asset_id: "abc123".into(),
            key: "Vibrant Colors / minecraft / textures/block/stone.png".into(),
            key_lower: "vibrant colors / minecraft / textures/block/stone.png".into(),
            source_type: SourceType::ResourcePack,
            source_name: "Vibrant Colors".into(),
            namespace: "minecraft".into(),
            relative_asset_path: "textures/block/stone.png".into(),
            extension: "png".into(),
            is_image: true,
            is_audio: false,
            container_path: PathBuf::from("/packs/vibrant.zip"),
            container_type: ContainerType::Zip,
            entry_path: "assets/minecraft/textures/block/stone.png".into(),
        };
        assert_eq!(
            record.tree_path_segments(),
            vec!["resourcepacks", "Vibrant Colors", "minecraft", "textures", "block", "stone.png"]
        );
    }

    #[test]
    fn test_scan_state_starts_estimating() {
        let state = ScanState::new("scan-1".into());
        assert_eq!(state.lifecycle, ScanLifecycle::Scanning);
        assert_eq!(state.phase, ScanPhase::Estimating);
        assert_eq!(state.scanned_containers, 0);
    }

    #[test]
    fn test_audio_format_serde_lowercase() {
        let json = serde_json::to_string(&AudioFormat::Mp3).unwrap();
        assert_eq!(json, "\"mp3\"");
    }
}
