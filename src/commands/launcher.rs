/// Launcher root autodetection and instance listing commands.
use crate::error::AppResult;
use crate::util::launcher_detection::{self, InstanceInfo, PrismRootCandidate};

/// `detect_prism_roots`: ordered list of candidate Prism Launcher roots.
pub fn detect_prism_roots_impl() -> AppResult<Vec<PrismRootCandidate>> {
    Ok(launcher_detection::detect_prism_roots())
}

/// `list_instances`: every instance folder under `prismRoot`.
pub fn list_instances_impl(prism_root: String) -> AppResult<Vec<InstanceInfo>> {
    launcher_detection::list_instances(&prism_root)
}
