/// Asset extraction & preview: serves raw bytes for an
/// already-indexed asset as base64, subject to a hard size cap.
use crate::config::PREVIEW_MAX_BYTES;
use crate::error::{AppError, AppResult};
use crate::model::AssetRecord;
use crate::util::container_reader::ContainerReader;
use base64::Engine;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub mime: String,
    pub base64: String,
}

fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "ogg" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "json" | "mcmeta" => "application/json",
        _ => "application/octet-stream",
    }
}

pub fn open_reader_for(record: &AssetRecord) -> anyhow::Result<ContainerReader> {
    use crate::model::ContainerType;
    match record.container_type {
        ContainerType::Directory => Ok(ContainerReader::directory(&record.container_path)),
        ContainerType::Zip | ContainerType::Jar => ContainerReader::zip(&record.container_path),
        ContainerType::AssetIndex => {
            let objects_root = record
                .container_path
                .parent()
                .map(|p| p.join("objects"))
                .unwrap_or_default();
            ContainerReader::asset_index(&record.container_path, objects_root)
        }
    }
}

/// Reads `record`'s bytes and base64-encodes them, refusing anything over
/// [`PREVIEW_MAX_BYTES`].
pub fn build_preview(record: &AssetRecord) -> AppResult<Preview> {
    let reader = open_reader_for(record)
        .map_err(|e| AppError::read(format!("cannot open container for preview: {}", e)))?;
    let bytes = reader
        .read(&record.entry_path)
        .map_err(|e| AppError::read(format!("cannot read {}: {}", record.entry_path, e)))?;

    if bytes.len() as u64 > PREVIEW_MAX_BYTES {
        return Err(AppError::preview_too_large(format!(
            "{} bytes exceeds the {} byte preview cap",
            bytes.len(),
            PREVIEW_MAX_BYTES
        )));
    }

    let extension = if record.extension.is_empty() && record.entry_path.ends_with(".mcmeta") {
        "mcmeta"
    } else {
        record.extension.as_str()
    };

    Ok(Preview {
        mime: mime_for_extension(extension).to_string(),
        base64: base64::engine::general_purpose::STANDARD.encode(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_known_extensions() {
        assert_eq!(mime_for_extension("png"), "image/png");
        assert_eq!(mime_for_extension("ogg"), "audio/ogg");
        assert_eq!(mime_for_extension("mcmeta"), "application/json");
    }

    #[test]
    fn test_mime_for_unknown_extension_falls_back() {
        assert_eq!(mime_for_extension("xyz"), "application/octet-stream");
    }

    #[test]
    fn test_build_preview_rejects_oversized_payload() {
        use crate::model::{ContainerType, SourceType};
        use std::path::PathBuf;

        let dir = std::env::temp_dir().join("prism_test_preview_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let oversized = vec![0u8; (PREVIEW_MAX_BYTES + 1) as usize];
        std::fs::write(dir.join("big.png"), &oversized).unwrap();

        let record = AssetRecord {
            asset_id: "abc".into(),
            key: "Pack / minecraft / big.png".into(),
            key_lower: "pack / minecraft / big.png".into(),
            source_type: SourceType::ResourcePack,
            source_name: "Pack".into(),
            namespace: "minecraft".into(),
            relative_asset_path: "big.png".into(),
            extension: "png".into(),
            is_image: true,
            is_audio: false,
            container_path: dir.clone(),
            container_type: ContainerType::Directory,
            entry_path: "big.png".into(),
        };

        let result = build_preview(&record);
        std::fs::remove_dir_all(&dir).ok();

        let err = result.unwrap_err();
        assert_eq!(err.code, "PreviewTooLarge");
    }

    #[test]
    fn test_build_preview_reads_small_file() {
        use crate::model::{ContainerType, SourceType};

        let dir = std::env::temp_dir().join("prism_test_preview_small");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("small.png"), b"fake-png-bytes").unwrap();

        let record = AssetRecord {
            asset_id: "abc".into(),
            key: "Pack / minecraft / small.png".into(),
            key_lower: "pack / minecraft / small.png".into(),
            source_type: SourceType::ResourcePack,
            source_name: "Pack".into(),
            namespace: "minecraft".into(),
            relative_asset_path: "small.png".into(),
            extension: "png".into(),
            is_image: true,
            is_audio: false,
            container_path: dir.clone(),
            container_type: ContainerType::Directory,
            entry_path: "small.png".into(),
        };

        let preview = build_preview(&record).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(preview.mime, "image/png");
        assert!(!preview.base64.is_empty());
    }
}
