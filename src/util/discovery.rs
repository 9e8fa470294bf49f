/// Container discovery: given an instance and the three source
/// toggles, yields the ordered, immutable container list a scan will walk.
use crate::error::{AppError, AppResult};
use crate::model::{Container, ContainerFingerprint, ContainerType, SourceType};
use crate::util::launcher_detection::instance_minecraft_dir;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

const MOD_EXTENSIONS: &[&str] = &["jar", "zip"];

pub fn discover_containers(
    prism_root: &str,
    instance_path: &str,
    include_vanilla: bool,
    include_mods: bool,
    include_resourcepacks: bool,
) -> AppResult<Vec<Container>> {
    crate::validation::validate_directory(instance_path, "Instance folder")?;

    let instance_dir = Path::new(instance_path);
    let mc_dir = instance_minecraft_dir(instance_dir);
    let mut containers = Vec::new();

    if include_vanilla {
        containers.extend(discover_vanilla(prism_root, instance_dir, &mc_dir)?);
    }
    if include_mods {
        containers.extend(discover_mods(&mc_dir)?);
    }
    if include_resourcepacks {
        containers.extend(discover_resourcepacks(&mc_dir)?);
    }

    Ok(containers)
}

/// Cheap stat-based fingerprint for a single file container (zip/jar/asset
/// index); directories use [`fingerprint_directory`] instead.
pub fn fingerprint_file(path: &Path, container_type: ContainerType) -> AppResult<ContainerFingerprint> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| AppError::container(format!("cannot stat {:?}: {}", path, e)))?;
    let modified_time_ns = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    Ok(ContainerFingerprint {
        container_path: path.to_string_lossy().to_string(),
        container_type,
        size: metadata.len(),
        modified_time_ns,
        content_hash: None,
    })
}

/// Directory fingerprint: `(path, hash of sorted (entryPath, size, mtime) list)`,
/// falling back to a content hash when any entry lacks a usable mtime.
pub fn fingerprint_directory(path: &Path) -> AppResult<ContainerFingerprint> {
    use sha2::{Digest, Sha256};

    let mut entries: Vec<(String, u64, u64)> = Vec::new();
    for entry in walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let rel = entry
            .path()
            .strip_prefix(path)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        let metadata = entry.metadata().ok();
        let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
        let mtime_ns = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        entries.push((rel, size, mtime_ns));
    }
    entries.sort();

    let mut hasher = Sha256::new();
    for (rel, size, mtime_ns) in &entries {
        hasher.update(rel.as_bytes());
        hasher.update(size.to_le_bytes());
        hasher.update(mtime_ns.to_le_bytes());
    }
    let digest = hex::encode(hasher.finalize());

    Ok(ContainerFingerprint {
        container_path: path.to_string_lossy().to_string(),
        container_type: ContainerType::Directory,
        size: entries.iter().map(|(_, size, _)| size).sum(),
        modified_time_ns: 0,
        content_hash: Some(digest),
    })
}

fn discover_vanilla(prism_root: &str, instance_dir: &Path, mc_dir: &Path) -> AppResult<Vec<Container>> {
    let mut containers = Vec::new();

    let version = super::launcher_detection::instance_intended_version(instance_dir);
    let Some(version) = version else {
        return Ok(containers);
    };

    if let Some(index_path) = resolve_asset_index_path(prism_root, mc_dir, &version) {
        let fingerprint = fingerprint_file(&index_path, ContainerType::AssetIndex)?;
        containers.push(Container {
            container_path: index_path,
            container_type: ContainerType::AssetIndex,
            source_type: SourceType::Vanilla,
            source_name: "minecraft".to_string(),
            fingerprint,
        });
    }

    let version_jar = mc_dir
        .join("versions")
        .join(&version)
        .join(format!("{}.jar", version));
    if version_jar.is_file() {
        let fingerprint = fingerprint_file(&version_jar, ContainerType::Jar)?;
        containers.push(Container {
            container_path: version_jar,
            container_type: ContainerType::Jar,
            source_type: SourceType::Vanilla,
            source_name: "minecraft".to_string(),
            fingerprint,
        });
    }

    Ok(containers)
}

/// Tries the instance-local assets tree first, then the shared tree one
/// level above the Prism instances directory — the common layout for
/// launchers that keep one assets store for every instance.
fn resolve_asset_index_path(prism_root: &str, mc_dir: &Path, version: &str) -> Option<PathBuf> {
    let candidates = [
        mc_dir.join("assets/indexes").join(format!("{}.json", version)),
        Path::new(prism_root)
            .parent()
            .map(|p| p.join("assets/indexes").join(format!("{}.json", version)))
            .unwrap_or_default(),
    ];
    candidates.into_iter().find(|p| p.is_file())
}

fn discover_mods(mc_dir: &Path) -> AppResult<Vec<Container>> {
    let mods_dir = mc_dir.join("mods");
    if !mods_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut filenames: Vec<PathBuf> = std::fs::read_dir(&mods_dir)
        .map_err(|e| AppError::discovery(format!("cannot read {:?}: {}", mods_dir, e)))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.ends_with(".disabled") {
                return false;
            }
            p.extension()
                .and_then(|e| e.to_str())
                .map(|ext| MOD_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    filenames.sort();

    let mut containers = Vec::with_capacity(filenames.len());
    for path in filenames {
        let container_type = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jar") => ContainerType::Jar,
            _ => ContainerType::Zip,
        };
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let fingerprint = fingerprint_file(&path, container_type)?;
        containers.push(Container {
            container_path: path,
            container_type,
            source_type: SourceType::Mod,
            source_name,
            fingerprint,
        });
    }
    Ok(containers)
}

fn discover_resourcepacks(mc_dir: &Path) -> AppResult<Vec<Container>> {
    let packs_dir = mc_dir.join("resourcepacks");
    if !packs_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(&packs_dir)
        .map_err(|e| AppError::discovery(format!("cannot read {:?}: {}", packs_dir, e)))?
        .flatten()
        .map(|e| e.path())
        .collect();
    entries.sort();

    let mut containers = Vec::with_capacity(entries.len());
    for path in entries {
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if path.is_dir() {
            if path.join("assets").is_dir() || path.join("pack.mcmeta").is_file() {
                let fingerprint = fingerprint_directory(&path)?;
                containers.push(Container {
                    container_path: path,
                    container_type: ContainerType::Directory,
                    source_type: SourceType::ResourcePack,
                    source_name,
                    fingerprint,
                });
            }
            continue;
        }

        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        if is_zip {
            let fingerprint = fingerprint_file(&path, ContainerType::Zip)?;
            containers.push(Container {
                container_path: path,
                container_type: ContainerType::Zip,
                source_type: SourceType::ResourcePack,
                source_name,
                fingerprint,
            });
        }
    }
    Ok(containers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_mods_skips_disabled_and_sorts() {
        let dir = std::env::temp_dir().join("prism_test_discover_mods");
        let mods_dir = dir.join("mods");
        std::fs::create_dir_all(&mods_dir).unwrap();
        std::fs::write(mods_dir.join("zeta.jar"), b"fake").unwrap();
        std::fs::write(mods_dir.join("alpha.jar"), b"fake").unwrap();
        std::fs::write(mods_dir.join("beta.jar.disabled"), b"fake").unwrap();

        let containers = discover_mods(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].source_name, "alpha.jar");
        assert_eq!(containers[1].source_name, "zeta.jar");
    }

    #[test]
    fn test_discover_resourcepacks_accepts_dir_and_zip() {
        let dir = std::env::temp_dir().join("prism_test_discover_rp");
        let packs_dir = dir.join("resourcepacks");
        std::fs::create_dir_all(packs_dir.join("Folder Pack/assets")).unwrap();
        std::fs::write(packs_dir.join("Zip Pack.zip"), b"fake").unwrap();
        std::fs::create_dir_all(packs_dir.join("Not A Pack")).unwrap();

        let containers = discover_resourcepacks(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(containers.len(), 2);
    }

    #[test]
    fn test_discover_containers_missing_instance_is_config_error() {
        let result =
            discover_containers("/unused", "/nonexistent/instance/for/sure", true, true, true);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code, "ConfigError");
    }

    #[test]
    fn test_fingerprint_directory_is_deterministic() {
        let dir = std::env::temp_dir().join("prism_test_fingerprint_dir");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), b"hello").unwrap();

        let first = fingerprint_directory(&dir).unwrap();
        let second = fingerprint_directory(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(first.content_hash, second.content_hash);
    }
}
