/// Persistent scan cache: one file per `(instance path, source
/// toggle set)`, written atomically, schema-versioned so stale formats are
/// discarded rather than misread.
use crate::config::{cache_root, CACHE_SCHEMA_VERSION};
use crate::model::{AssetRecord, ContainerFingerprint};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub schema_version: u32,
    pub records: Vec<AssetRecord>,
    pub fingerprints: HashMap<String, ContainerFingerprint>,
}

/// Normalizes `(instancePath, toggles)` into a stable cache key keyed by
/// instance path and the normalized source toggle set.
pub fn cache_key(
    instance_path: &str,
    include_vanilla: bool,
    include_mods: bool,
    include_resourcepacks: bool,
) -> String {
    format!(
        "{}|{}{}{}",
        instance_path,
        if include_vanilla { "v" } else { "-" },
        if include_mods { "m" } else { "-" },
        if include_resourcepacks { "r" } else { "-" },
    )
}

fn cache_file_path(key: &str) -> anyhow::Result<PathBuf> {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = hex::encode(hasher.finalize());
    Ok(cache_root()?.join(format!("{}.json", digest)))
}

/// Loads a cached snapshot for `key`, returning `None` on a miss or on any
/// read/parse/schema-version failure — a cache error always downgrades to
/// a cache miss, never fatal.
pub fn load(key: &str) -> Option<CacheSnapshot> {
    let path = cache_file_path(key).ok()?;
    let contents = std::fs::read_to_string(&path).ok()?;
    let snapshot: CacheSnapshot = serde_json::from_str(&contents).ok()?;
    if snapshot.schema_version != CACHE_SCHEMA_VERSION {
        log::warn!(
            "discarding scan cache {:?}: schema version {} != {}",
            path,
            snapshot.schema_version,
            CACHE_SCHEMA_VERSION
        );
        return None;
    }
    Some(snapshot)
}

/// Writes a snapshot via write-to-temp-then-rename so a crash mid-write
/// never leaves a half-written cache file.
pub fn store(
    key: &str,
    records: &[AssetRecord],
    fingerprints: &HashMap<String, ContainerFingerprint>,
) -> anyhow::Result<()> {
    let path = cache_file_path(key)?;
    let snapshot = CacheSnapshot {
        schema_version: CACHE_SCHEMA_VERSION,
        records: records.to_vec(),
        fingerprints: fingerprints.clone(),
    };
    let serialized = serde_json::to_vec(&snapshot)?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &serialized)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}
