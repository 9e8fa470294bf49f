/// Prism Launcher root autodetection and instance listing
/// (`detect_prism_roots`, `list_instances`).
///
/// Everything here is a convenience heuristic exposed to the presentation
/// layer; nothing downstream of container discovery depends on these
/// functions succeeding, since `start_scan` also accepts an explicit
/// `prismRoot`/`instanceFolder` pair.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where a candidate root's path came from, for the frontend's display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RootSource {
    Default,
    Environment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrismRootCandidate {
    pub path: String,
    pub exists: bool,
    pub valid: bool,
    pub source: RootSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInfo {
    pub folder_name: String,
    pub display_name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minecraft_version: Option<String>,
}

/// A root is "valid" once it has at least one subdirectory that looks like
/// an instance (holds `instance.cfg` or `mmc-pack.json`).
fn is_valid_prism_root(path: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(path) else {
        return false;
    };
    for entry in entries.flatten() {
        let candidate = entry.path();
        if candidate.is_dir()
            && (candidate.join("instance.cfg").exists() || candidate.join("mmc-pack.json").exists())
        {
            return true;
        }
    }
    false
}

fn candidate(path: PathBuf, source: RootSource) -> PrismRootCandidate {
    let exists = path.exists();
    let valid = exists && is_valid_prism_root(&path);
    PrismRootCandidate {
        path: path.to_string_lossy().to_string(),
        exists,
        valid,
        source,
    }
}

#[cfg(target_os = "macos")]
fn platform_default_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(home) = std::env::var("HOME") {
        roots.push(PathBuf::from(home).join("Library/Application Support/PrismLauncher/instances"));
    }
    roots
}

#[cfg(target_os = "windows")]
fn platform_default_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(appdata) = std::env::var("APPDATA") {
        roots.push(PathBuf::from(appdata).join("PrismLauncher/instances"));
    }
    roots
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_default_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(home) = std::env::var("HOME") {
        roots.push(PathBuf::from(&home).join(".local/share/PrismLauncher/instances"));
        roots.push(PathBuf::from(&home).join(".local/share/prismlauncher/instances"));
    }
    roots
}

/// Ordered candidate list: platform default locations first, then
/// `PRISM_LAUNCHER_DIR` if set, deduplicated by path.
pub fn detect_prism_roots() -> Vec<PrismRootCandidate> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();

    for path in platform_default_roots() {
        if seen.insert(path.clone()) {
            result.push(candidate(path, RootSource::Default));
        }
    }

    if let Ok(custom) = std::env::var("PRISM_LAUNCHER_DIR") {
        let path = PathBuf::from(custom).join("instances");
        if seen.insert(path.clone()) {
            result.push(candidate(path, RootSource::Environment));
        }
    }

    result
}

/// Extracts `IntendedVersion=` from a Prism `instance.cfg`, the simplest and
/// most common way an instance records its Minecraft version.
fn read_intended_version(instance_dir: &Path) -> Option<String> {
    let cfg_path = instance_dir.join("instance.cfg");
    let contents = std::fs::read_to_string(cfg_path).ok()?;
    for line in contents.lines() {
        if let Some(value) = line.strip_prefix("IntendedVersion=") {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Falls back to `mmc-pack.json`'s `net.minecraft` component when
/// `instance.cfg` doesn't carry a version (older instance formats).
fn read_mmc_pack_version(instance_dir: &Path) -> Option<String> {
    let pack_path = instance_dir.join("mmc-pack.json");
    let contents = std::fs::read_to_string(pack_path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&contents).ok()?;
    value
        .get("components")?
        .as_array()?
        .iter()
        .find(|c| c.get("uid").and_then(|u| u.as_str()) == Some("net.minecraft"))
        .and_then(|c| c.get("version"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Reads the `name=` field from `instance.cfg`, falling back to the folder
/// name when absent.
fn read_display_name(instance_dir: &Path, folder_name: &str) -> String {
    let cfg_path = instance_dir.join("instance.cfg");
    if let Ok(contents) = std::fs::read_to_string(cfg_path) {
        for line in contents.lines() {
            if let Some(value) = line.strip_prefix("name=") {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }
    folder_name.to_string()
}

/// Lists every subdirectory of `prismRoot` that looks like an instance,
/// sorted by folder name for deterministic presentation.
pub fn list_instances(prism_root: &str) -> crate::error::AppResult<Vec<InstanceInfo>> {
    crate::validation::validate_directory(prism_root, "Prism root")?;
    let root = Path::new(prism_root);

    let entries = std::fs::read_dir(root).map_err(|e| {
        crate::error::AppError::discovery(format!("failed to read {}: {}", prism_root, e))
    })?;

    let mut instances: Vec<InstanceInfo> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if !(path.join("instance.cfg").exists() || path.join("mmc-pack.json").exists()) {
            continue;
        }
        let folder_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let minecraft_version =
            read_intended_version(&path).or_else(|| read_mmc_pack_version(&path));
        instances.push(InstanceInfo {
            display_name: read_display_name(&path, &folder_name),
            folder_name,
            path: path.to_string_lossy().to_string(),
            minecraft_version,
        });
    }

    instances.sort_by(|a, b| a.folder_name.cmp(&b.folder_name));
    Ok(instances)
}

/// Public wrapper combining `instance.cfg` and `mmc-pack.json` version
/// resolution, used by Container Discovery to locate the vanilla asset index.
pub fn instance_intended_version(instance_dir: &Path) -> Option<String> {
    read_intended_version(instance_dir).or_else(|| read_mmc_pack_version(instance_dir))
}

/// Resolves `<instance>/.minecraft` if present, otherwise the instance
/// folder itself (some exported packs place `mods`/`resourcepacks` directly
/// under the instance root).
pub fn instance_minecraft_dir(instance_path: &Path) -> PathBuf {
    let dot_minecraft = instance_path.join(".minecraft");
    if dot_minecraft.is_dir() {
        dot_minecraft
    } else {
        instance_path.to_path_buf()
    }
}
