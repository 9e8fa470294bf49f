//! Filesystem roots and sizing knobs every component reads once at startup.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Directory under which the persistent scan cache keeps one file per cache
/// key. Same `dirs::cache_dir()` convention `vanilla_textures::get_vanilla_cache_dir`
/// uses.
pub fn cache_root() -> Result<PathBuf> {
    let root = dirs::cache_dir()
        .context("could not determine the platform cache directory")?
        .join("prism-asset-engine")
        .join("scans");
    std::fs::create_dir_all(&root).context("failed to create scan cache directory")?;
    Ok(root)
}

/// Staging directory for copy-to-clipboard exports.
pub fn clipboard_staging_root() -> Result<PathBuf> {
    let root = dirs::cache_dir()
        .context("could not determine the platform cache directory")?
        .join("prism-asset-engine")
        .join("clipboard-staging");
    std::fs::create_dir_all(&root).context("failed to create clipboard staging directory")?;
    Ok(root)
}

/// Bounded worker pool size for the scan orchestrator: `min(CPUs, 8)`.
pub fn worker_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(8)
}

/// Maximum bytes `get_asset_preview` will serve before failing with
/// `PreviewTooLarge`.
pub const PREVIEW_MAX_BYTES: u64 = 16 * 1024 * 1024;

/// Grace period `start_scan` waits for a superseded scan to reach a
/// terminal lifecycle before proceeding regardless.
pub const SUPERSEDE_GRACE: std::time::Duration = std::time::Duration::from_secs(6);

/// Upper bound on how often `scan://progress`/`export://progress` are
/// emitted for a single scan/operation; progress callbacks are coalesced to
/// roughly this interval.
pub const PROGRESS_COALESCE_INTERVAL: std::time::Duration =
    std::time::Duration::from_millis(50);

/// Current on-disk schema version for cache snapshots; a mismatch discards
/// the cached snapshot instead of misreading it.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_pool_size_bounded() {
        assert!(worker_pool_size() >= 1);
        assert!(worker_pool_size() <= 8);
    }
}
