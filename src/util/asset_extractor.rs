/// Asset extractor: walks one container's entries and turns the
/// admitted ones into [`AssetRecord`]s.
use crate::model::{AssetRecord, Container, SourceType};
use crate::util::container_reader::ContainerReader;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tga"];
const AUDIO_EXTENSIONS: &[&str] = &["ogg", "mp3", "wav", "flac"];

/// Outcome of extracting one container: the records it produced plus a
/// count of malformed entries that were skipped without aborting.
pub struct ExtractionResult {
    pub records: Vec<AssetRecord>,
    pub skipped_entries: usize,
}

/// Walks every entry `reader` enumerates, checking `cancel` before each one
/// so a mid-container cancellation request doesn't have to wait out the
/// whole container (which can run to thousands of entries for a vanilla
/// asset index or a large resource pack zip).
pub fn extract_container(
    container: &Container,
    reader: &ContainerReader,
    cancel: &Arc<AtomicBool>,
) -> anyhow::Result<ExtractionResult> {
    let entries = reader.enumerate()?;
    let mut records = Vec::new();
    let mut skipped_entries = 0;

    for entry_path in entries {
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        match build_record(container, &entry_path) {
            Some(record) => records.push(record),
            None => {
                if is_malformed(&entry_path) {
                    skipped_entries += 1;
                }
            }
        }
    }

    Ok(ExtractionResult {
        records,
        skipped_entries,
    })
}

/// Entries that look like real data but fail admission for a reason other
/// than "not under assets/" count toward the error tally.
fn is_malformed(entry: &str) -> bool {
    entry.contains("..") || entry.contains('\0')
}

fn is_ignored(entry: &str) -> bool {
    entry.starts_with("__MACOSX/") || entry.ends_with(".DS_Store")
}

/// `raw_entry` is already the normalized `assets/<namespace>/...` path every
/// `ContainerReader::enumerate()` implementation yields, and is also what
/// `ContainerReader::read()` expects back to fetch the bytes.
fn build_record(container: &Container, raw_entry: &str) -> Option<AssetRecord> {
    let entry_path = raw_entry.replace('\\', "/");

    if is_ignored(&entry_path) || is_malformed(&entry_path) {
        return None;
    }

    let rest = entry_path.strip_prefix("assets/")?;
    let mut segments = rest.splitn(2, '/');
    let namespace = segments.next().filter(|s| !s.is_empty())?;
    let relative_asset_path = segments.next().filter(|s| !s.is_empty())?;

    let final_segment = relative_asset_path.rsplit('/').next().unwrap_or(relative_asset_path);
    let extension = match final_segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    };

    let is_image = IMAGE_EXTENSIONS.contains(&extension.as_str());
    let is_audio = AUDIO_EXTENSIONS.contains(&extension.as_str());

    let asset_id = derive_asset_id(&container.container_path.to_string_lossy(), &entry_path);
    let key = format!(
        "{} / {} / {}",
        container.source_name, namespace, relative_asset_path
    );
    let key_lower = key.to_lowercase();

    Some(AssetRecord {
        asset_id,
        key,
        key_lower,
        source_type: container.source_type,
        source_name: container.source_name.clone(),
        namespace: namespace.to_string(),
        relative_asset_path: relative_asset_path.to_string(),
        extension,
        is_image,
        is_audio,
        container_path: container.container_path.clone(),
        container_type: container.container_type,
        entry_path,
    })
}

/// 128-bit digest of `(containerPath, entryPath)`, truncated to its first 16
/// bytes and hex-encoded — stable across reruns on unchanged containers,
/// which is what lets reconciliation match surviving ids after a refresh.
pub fn derive_asset_id(container_path: &str, entry_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(container_path.as_bytes());
    hasher.update(b"\0");
    hasher.update(entry_path.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// The namespace an asset-index container's entries are admitted under when
/// the virtual path doesn't already start with a namespace segment.
pub fn normalize_asset_index_entry(virtual_path: &str) -> String {
    if virtual_path.starts_with("minecraft/") {
        format!("assets/{}", virtual_path)
    } else {
        format!("assets/minecraft/{}", virtual_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContainerFingerprint, ContainerType};
    use std::path::PathBuf;

    fn test_container() -> Container {
        Container {
            container_path: PathBuf::from("/packs/vibrant.zip"),
            container_type: ContainerType::Zip,
            source_type: SourceType::ResourcePack,
            source_name: "Vibrant Colors".to_string(),
            fingerprint: ContainerFingerprint {
                container_path: "/packs/vibrant.zip".to_string(),
                container_type: ContainerType::Zip,
                size: 0,
                modified_time_ns: 0,
                content_hash: None,
            },
        }
    }

    #[test]
    fn test_build_record_admits_valid_entry() {
        let container = test_container();
        let record = build_record(&container, "assets/minecraft/textures/block/stone.png").unwrap();
        assert_eq!(record.namespace, "minecraft");
        assert_eq!(record.relative_asset_path, "textures/block/stone.png");
        assert_eq!(record.extension, "png");
        assert!(record.is_image);
        assert!(!record.is_audio);
        assert_eq!(record.key, "Vibrant Colors / minecraft / textures/block/stone.png");
        assert_eq!(record.entry_path, "assets/minecraft/textures/block/stone.png");
    }

    #[test]
    fn test_build_record_rejects_entry_not_under_assets() {
        let container = test_container();
        assert!(build_record(&container, "pack.mcmeta").is_none());
    }

    #[test]
    fn test_build_record_rejects_empty_namespace() {
        let container = test_container();
        assert!(build_record(&container, "assets//textures/block/stone.png").is_none());
    }

    #[test]
    fn test_build_record_rejects_traversal() {
        let container = test_container();
        assert!(build_record(&container, "assets/minecraft/../../etc/passwd").is_none());
    }

    #[test]
    fn test_build_record_rejects_macosx_and_ds_store() {
        let container = test_container();
        assert!(build_record(&container, "__MACOSX/assets/minecraft/a.png").is_none());
        assert!(build_record(&container, "assets/minecraft/.DS_Store").is_none());
    }

    #[test]
    fn test_audio_flag_set_for_ogg() {
        let container = test_container();
        let record = build_record(&container, "assets/minecraft/sounds/dig/stone1.ogg").unwrap();
        assert!(record.is_audio);
        assert!(!record.is_image);
    }

    #[test]
    fn test_extract_container_stores_normalized_entry_path_for_asset_index() {
        let dir = std::env::temp_dir().join("prism_test_extract_asset_index_entry_path");
        std::fs::create_dir_all(dir.join("objects/ab")).unwrap();
        std::fs::write(dir.join("objects/ab/abcdef0123456789"), b"fake-icon").unwrap();
        let index_path = dir.join("index.json");
        std::fs::write(
            &index_path,
            r#"{"objects":{"icons/icon_16x16.png":{"hash":"abcdef0123456789","size":9}}}"#,
        )
        .unwrap();

        let reader = ContainerReader::asset_index(&index_path, dir.join("objects")).unwrap();
        let container = Container {
            container_path: index_path.clone(),
            container_type: ContainerType::AssetIndex,
            source_type: SourceType::Vanilla,
            source_name: "1.20.1".to_string(),
            fingerprint: crate::model::ContainerFingerprint {
                container_path: index_path.to_string_lossy().to_string(),
                container_type: ContainerType::AssetIndex,
                size: 0,
                modified_time_ns: 0,
                content_hash: None,
            },
        };

        let cancel = Arc::new(AtomicBool::new(false));
        let result = extract_container(&container, &reader, &cancel).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.entry_path, "assets/minecraft/icons/icon_16x16.png");
        assert!(record.entry_path.starts_with("assets/"));
        assert_eq!(record.namespace, "minecraft");
        assert_eq!(record.relative_asset_path, "icons/icon_16x16.png");
    }

    #[test]
    fn test_extract_container_stops_early_when_cancelled() {
        let dir = std::env::temp_dir().join("prism_test_extract_cancel");
        std::fs::create_dir_all(dir.join("assets/minecraft")).unwrap();
        std::fs::write(dir.join("assets/minecraft/a.png"), b"fake").unwrap();
        std::fs::write(dir.join("assets/minecraft/b.png"), b"fake").unwrap();

        let reader = ContainerReader::directory(&dir);
        let container = Container {
            container_path: dir.clone(),
            container_type: ContainerType::Directory,
            source_type: SourceType::ResourcePack,
            source_name: "Vibrant Colors".to_string(),
            fingerprint: ContainerFingerprint {
                container_path: dir.to_string_lossy().to_string(),
                container_type: ContainerType::Directory,
                size: 0,
                modified_time_ns: 0,
                content_hash: None,
            },
        };
        let cancel = Arc::new(AtomicBool::new(true));

        let result = extract_container(&container, &reader, &cancel).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert!(result.records.is_empty());
    }

    #[test]
    fn test_derive_asset_id_is_deterministic() {
        let a = derive_asset_id("/packs/vibrant.zip", "assets/minecraft/textures/block/stone.png");
        let b = derive_asset_id("/packs/vibrant.zip", "assets/minecraft/textures/block/stone.png");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_derive_asset_id_differs_by_entry_path() {
        let a = derive_asset_id("/packs/vibrant.zip", "assets/minecraft/a.png");
        let b = derive_asset_id("/packs/vibrant.zip", "assets/minecraft/b.png");
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalize_asset_index_entry() {
        assert_eq!(
            normalize_asset_index_entry("minecraft/sounds/dig/stone1.ogg"),
            "assets/minecraft/sounds/dig/stone1.ogg"
        );
        assert_eq!(
            normalize_asset_index_entry("icons/icon_16x16.png"),
            "assets/minecraft/icons/icon_16x16.png"
        );
    }
}
