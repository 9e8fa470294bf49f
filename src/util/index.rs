/// In-memory index: the frozen record set for one scan, plus the
/// auxiliary maps built lazily to serve search and tree queries.
use crate::model::{AssetRecord, ReconcileResult, TreeNode, TreeNodeType};
use std::collections::HashMap;
use std::sync::RwLock;

pub struct Index {
    records: Vec<AssetRecord>,
    id_to_index: HashMap<String, usize>,
    tree_children: RwLock<Option<HashMap<String, Vec<String>>>>,
}

pub struct SearchFilter {
    pub include_images: bool,
    pub include_audio: bool,
    pub include_other: bool,
}

impl Index {
    pub fn build(records: Vec<AssetRecord>) -> Self {
        let id_to_index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.asset_id.clone(), i))
            .collect();
        Self {
            records,
            id_to_index,
            tree_children: RwLock::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, asset_id: &str) -> Option<&AssetRecord> {
        self.id_to_index.get(asset_id).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    /// `search`: kind filter, then AND-of-substrings token match scoped
    /// to `folder_node_id`, returning `(total, page)` in insertion order.
    pub fn search(
        &self,
        query: &str,
        folder_node_id: Option<&str>,
        filter: &SearchFilter,
        offset: usize,
        limit: usize,
    ) -> (usize, Vec<&AssetRecord>) {
        let tokens: Vec<String> = query
            .trim()
            .to_lowercase()
            .split_whitespace()
            .map(|s| s.to_string())
            .collect();

        let matches: Vec<&AssetRecord> = self
            .records
            .iter()
            .filter(|r| self.under_folder(r, folder_node_id))
            .filter(|r| {
                (r.is_image && filter.include_images)
                    || (r.is_audio && filter.include_audio)
                    || (!r.is_image && !r.is_audio && filter.include_other)
            })
            .filter(|r| tokens.iter().all(|t| r.key_lower.contains(t.as_str())))
            .collect();

        let total = matches.len();
        let page = matches.into_iter().skip(offset).take(limit).collect();
        (total, page)
    }

    fn under_folder(&self, record: &AssetRecord, folder_node_id: Option<&str>) -> bool {
        match folder_node_id {
            None => true,
            Some(id) if id.is_empty() => true,
            Some(id) => {
                let path = self.folder_path(record);
                path == id || path.starts_with(&format!("{}/", id))
            }
        }
    }

    fn folder_path(&self, record: &AssetRecord) -> String {
        record.tree_path_segments().join("/")
    }

    /// Lazily builds the `parentId -> [childId]` map on first tree query,
    /// deriving folder structure from the flat record list.
    fn ensure_tree_built(&self) {
        {
            let guard = self.tree_children.read().expect("tree lock poisoned");
            if guard.is_some() {
                return;
            }
        }
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for record in &self.records {
            let segments = record.tree_path_segments();
            let mut parent = String::new();
            for (i, segment) in segments.iter().enumerate() {
                let is_leaf = i == segments.len() - 1;
                let child_id = if is_leaf {
                    format!("{}/file:{}", parent, record.asset_id)
                } else if parent.is_empty() {
                    segment.to_string()
                } else {
                    format!("{}/{}", parent, segment)
                };
                let bucket = children.entry(parent.clone()).or_default();
                if !bucket.contains(&child_id) {
                    bucket.push(child_id.clone());
                }
                parent = child_id;
            }
        }
        let mut guard = self.tree_children.write().expect("tree lock poisoned");
        *guard = Some(children);
    }

    /// `tree`: direct children of `node_id` (root = `""`). Folders carry
    /// `hasChildren = true`, file leaves carry their `assetId`.
    pub fn tree(&self, node_id: &str) -> Vec<TreeNode> {
        self.ensure_tree_built();
        let guard = self.tree_children.read().expect("tree lock poisoned");
        let children = guard.as_ref().expect("tree built above");

        let Some(child_ids) = children.get(node_id) else {
            return Vec::new();
        };

        child_ids
            .iter()
            .map(|child_id| {
                if let Some(asset_id) = child_id.rsplit("/file:").next().filter(|_| child_id.contains("/file:")) {
                    let name = self
                        .get(asset_id)
                        .map(|r| {
                            r.relative_asset_path
                                .rsplit('/')
                                .next()
                                .unwrap_or(&r.relative_asset_path)
                                .to_string()
                        })
                        .unwrap_or_default();
                    TreeNode {
                        id: child_id.clone(),
                        name,
                        node_type: TreeNodeType::File,
                        has_children: false,
                        asset_id: Some(asset_id.to_string()),
                    }
                } else {
                    let name = child_id.rsplit('/').next().unwrap_or(child_id).to_string();
                    let has_children = children.get(child_id).map(|c| !c.is_empty()).unwrap_or(false);
                    TreeNode {
                        id: child_id.clone(),
                        name,
                        node_type: TreeNodeType::Folder,
                        has_children,
                        asset_id: None,
                    }
                }
            })
            .collect()
    }

    /// `reconcileAssetIds`: ids unaffected by a refresh map to
    /// themselves. For ids the refresh dropped, `stale_records` (the prior
    /// scan's records for exactly those ids, kept by the orchestrator across
    /// the index swap) lets a structural match on `(sourceName, namespace,
    /// relativeAssetPath, extension)` find the surviving replacement.
    /// Everything else is reported unknown.
    pub fn reconcile_asset_ids(
        &self,
        old_ids: &[String],
        stale_records: &HashMap<String, AssetRecord>,
    ) -> ReconcileResult {
        let mut id_map = HashMap::new();
        let mut unknown_ids = Vec::new();

        for old_id in old_ids {
            if self.id_to_index.contains_key(old_id) {
                id_map.insert(old_id.clone(), old_id.clone());
                continue;
            }
            match stale_records
                .get(old_id)
                .and_then(|stale| self.unique_structural_match(stale))
            {
                Some(new_id) => {
                    id_map.insert(old_id.clone(), new_id);
                }
                None => unknown_ids.push(old_id.clone()),
            }
        }

        ReconcileResult { id_map, unknown_ids }
    }

    fn unique_structural_match(&self, stale: &AssetRecord) -> Option<String> {
        let mut found: Option<&AssetRecord> = None;
        for record in &self.records {
            if record.source_name == stale.source_name
                && record.namespace == stale.namespace
                && record.relative_asset_path == stale.relative_asset_path
                && record.extension == stale.extension
            {
                if found.is_some() {
                    return None;
                }
                found = Some(record);
            }
        }
        found.map(|r| r.asset_id.clone())
    }
}
