/// Uniform read interface over the three physical container forms: plain
/// directory, ZIP-like archive, and a Minecraft hash-addressed asset index.
/// Modeled as a closed tagged variant with one implementation per kind
/// rather than a trait-object hierarchy.
use crate::util::asset_extractor::normalize_asset_index_entry;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;
use zip::ZipArchive;

/// A single entry path, already forward-slash normalized.
pub type EntryPath = String;

pub enum ContainerReader {
    Directory(DirectoryReader),
    Zip(ZipReader),
    AssetIndex(AssetIndexReader),
}

impl ContainerReader {
    pub fn directory(root: impl Into<PathBuf>) -> Self {
        ContainerReader::Directory(DirectoryReader { root: root.into() })
    }

    pub fn zip(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(ContainerReader::Zip(ZipReader::open(path.into())?))
    }

    pub fn asset_index(index_json_path: &Path, objects_root: impl Into<PathBuf>) -> Result<Self> {
        Ok(ContainerReader::AssetIndex(AssetIndexReader::load(
            index_json_path,
            objects_root.into(),
        )?))
    }

    /// Enumerate entry paths without reading any bytes.
    pub fn enumerate(&self) -> Result<Vec<EntryPath>> {
        match self {
            ContainerReader::Directory(r) => r.enumerate(),
            ContainerReader::Zip(r) => r.enumerate(),
            ContainerReader::AssetIndex(r) => r.enumerate(),
        }
    }

    /// Read one entry's bytes. Implementations must not retain the buffer.
    pub fn read(&self, entry: &str) -> Result<Vec<u8>> {
        match self {
            ContainerReader::Directory(r) => r.read(entry),
            ContainerReader::Zip(r) => r.read(entry),
            ContainerReader::AssetIndex(r) => r.read(entry),
        }
    }
}

pub struct DirectoryReader {
    root: PathBuf,
}

impl DirectoryReader {
    fn enumerate(&self) -> Result<Vec<EntryPath>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .with_context(|| format!("{:?} is not under {:?}", entry.path(), self.root))?;
            entries.push(rel.to_string_lossy().replace('\\', "/"));
        }
        Ok(entries)
    }

    fn read(&self, entry: &str) -> Result<Vec<u8>> {
        let path = self.root.join(entry);
        std::fs::read(&path).with_context(|| format!("failed to read {:?}", path))
    }
}

/// Opened once per container; the parsed central directory is cached in
/// `names` for the container's lifetime. Archive libraries are
/// generally not `Sync`-safe to call concurrently, so reads reopen a fresh
/// `ZipArchive` handle from the same file path under a mutex rather than
/// sharing one decoder across threads.
pub struct ZipReader {
    path: PathBuf,
    names: Vec<String>,
    archive: Mutex<ZipArchive<File>>,
}

impl ZipReader {
    fn open(path: PathBuf) -> Result<Self> {
        let file = File::open(&path).with_context(|| format!("failed to open {:?}", path))?;
        let mut archive =
            ZipArchive::new(file).with_context(|| format!("{:?} is not a valid zip", path))?;
        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if entry.is_file() {
                names.push(entry.name().replace('\\', "/"));
            }
        }
        Ok(Self {
            path,
            names,
            archive: Mutex::new(archive),
        })
    }

    fn enumerate(&self) -> Result<Vec<EntryPath>> {
        Ok(self.names.clone())
    }

    fn read(&self, entry: &str) -> Result<Vec<u8>> {
        let mut guard = self
            .archive
            .lock()
            .map_err(|_| anyhow!("zip archive mutex poisoned for {:?}", self.path))?;
        let mut zip_file = guard
            .by_name(entry)
            .with_context(|| format!("{:?} has no entry {}", self.path, entry))?;
        let mut buf = Vec::with_capacity(zip_file.size() as usize);
        zip_file.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

#[derive(Debug, Deserialize)]
struct RawAssetIndex {
    objects: HashMap<String, RawAssetObject>,
}

#[derive(Debug, Deserialize)]
struct RawAssetObject {
    hash: String,
}

/// Enumerates keys from the parsed index JSON and resolves reads to
/// `objects/<first-two-hex>/<full-hash>` under the shared assets tree. Keys
/// are stored and enumerated already normalized to `assets/<namespace>/...`
/// form, same as every other `ContainerReader` variant yields, so callers
/// never see the asset index's raw `minecraft/...`/bare virtual paths.
pub struct AssetIndexReader {
    objects_root: PathBuf,
    entries: HashMap<String, String>,
}

impl AssetIndexReader {
    fn load(index_json_path: &Path, objects_root: PathBuf) -> Result<Self> {
        let raw = std::fs::read_to_string(index_json_path)
            .with_context(|| format!("failed to read asset index {:?}", index_json_path))?;
        let parsed: RawAssetIndex = serde_json::from_str(&raw)
            .with_context(|| format!("{:?} is not a valid asset index", index_json_path))?;
        let entries = parsed
            .objects
            .into_iter()
            .map(|(virtual_path, obj)| (normalize_asset_index_entry(&virtual_path), obj.hash))
            .collect();
        Ok(Self {
            objects_root,
            entries,
        })
    }

    fn enumerate(&self) -> Result<Vec<EntryPath>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn read(&self, entry: &str) -> Result<Vec<u8>> {
        let hash = self
            .entries
            .get(entry)
            .ok_or_else(|| anyhow!("asset index has no entry {}", entry))?;
        if hash.len() < 2 {
            return Err(anyhow!("malformed hash {} for entry {}", hash, entry));
        }
        let path = self.objects_root.join(&hash[0..2]).join(hash);
        std::fs::read(&path).with_context(|| format!("missing hash object {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_directory_reader_enumerate_and_read() {
        let dir = std::env::temp_dir().join("prism_test_dir_reader");
        let assets_dir = dir.join("assets/minecraft/textures/block");
        std::fs::create_dir_all(&assets_dir).unwrap();
        std::fs::write(assets_dir.join("stone.png"), b"fake-png").unwrap();

        let reader = ContainerReader::directory(&dir);
        let entries = reader.enumerate().unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], "assets/minecraft/textures/block/stone.png");
    }

    #[test]
    fn test_directory_reader_read_bytes() {
        let dir = std::env::temp_dir().join("prism_test_dir_reader_read");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), b"hello").unwrap();

        let reader = ContainerReader::directory(&dir);
        let bytes = reader.read("a.txt").unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_zip_reader_enumerate_and_read() {
        let zip_path = std::env::temp_dir().join("prism_test_reader.zip");
        {
            let file = File::create(&zip_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            writer
                .start_file::<_, ()>("assets/minecraft/sounds/dig/stone1.ogg", Default::default())
                .unwrap();
            writer.write_all(b"fake-ogg-data").unwrap();
            writer.finish().unwrap();
        }

        let reader = ContainerReader::zip(&zip_path).unwrap();
        let entries = reader.enumerate().unwrap();
        assert_eq!(entries, vec!["assets/minecraft/sounds/dig/stone1.ogg"]);

        let bytes = reader.read("assets/minecraft/sounds/dig/stone1.ogg").unwrap();
        std::fs::remove_file(&zip_path).ok();

        assert_eq!(bytes, b"fake-ogg-data");
    }

    #[test]
    fn test_asset_index_reader_missing_object_is_read_error() {
        let dir = std::env::temp_dir().join("prism_test_asset_index");
        std::fs::create_dir_all(&dir).unwrap();
        let index_path = dir.join("index.json");
        std::fs::write(
            &index_path,
            r#"{"objects":{"minecraft/sounds/dig.ogg":{"hash":"abcdef0123456789","size":10}}}"#,
        )
        .unwrap();

        let reader = ContainerReader::asset_index(&index_path, dir.join("objects")).unwrap();
        let entries = reader.enumerate().unwrap();
        assert_eq!(entries, vec!["assets/minecraft/sounds/dig.ogg"]);

        let result = reader.read("assets/minecraft/sounds/dig.ogg");
        std::fs::remove_dir_all(&dir).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_asset_index_reader_enumerates_normalized_entry_paths() {
        let dir = std::env::temp_dir().join("prism_test_asset_index_normalized");
        std::fs::create_dir_all(&dir).unwrap();
        let index_path = dir.join("index.json");
        std::fs::write(
            &index_path,
            r#"{"objects":{"icons/icon_16x16.png":{"hash":"abcdef0123456789","size":10}}}"#,
        )
        .unwrap();

        let reader = ContainerReader::asset_index(&index_path, dir.join("objects")).unwrap();
        let entries = reader.enumerate().unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(entries, vec!["assets/minecraft/icons/icon_16x16.png"]);
    }
}
