/// Scan orchestrator: drives discovery output through the container reader
/// and extractor over a bounded worker pool, tracking two-phase progress
/// and honoring cancellation between containers and before each archive
/// read.
use crate::config::PROGRESS_COALESCE_INTERVAL;
use crate::model::{AssetRecord, Container, ContainerFingerprint, ContainerType};
use crate::util::asset_extractor::extract_container;
use crate::util::container_reader::ContainerReader;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

pub struct ScanProgressSnapshot {
    pub scanned_containers: usize,
    pub total_containers: usize,
    pub asset_count: usize,
}

pub struct ScanOutcome {
    pub records: Vec<AssetRecord>,
    pub fingerprints: HashMap<String, ContainerFingerprint>,
    pub cancelled: bool,
    pub container_errors: usize,
}

struct ScanCounters {
    scanned_containers: AtomicUsize,
    asset_count: AtomicUsize,
    total_containers: usize,
}

/// Opens the right `ContainerReader` variant for `container`. Also used by
/// the refresh sweep in `commands::scan` to re-extract a single changed
/// container outside a full `run_scan` pass.
pub fn open_reader(container: &Container) -> anyhow::Result<ContainerReader> {
    match container.container_type {
        ContainerType::Directory => Ok(ContainerReader::directory(&container.container_path)),
        ContainerType::Zip | ContainerType::Jar => ContainerReader::zip(&container.container_path),
        ContainerType::AssetIndex => {
            let objects_root = container
                .container_path
                .parent()
                .map(|p| p.join("objects"))
                .unwrap_or_default();
            ContainerReader::asset_index(&container.container_path, objects_root)
        }
    }
}

/// Runs one full scan (or refresh sweep) over an already-discovered
/// container list. `on_progress` is invoked from a dedicated monitor thread
/// at roughly [`PROGRESS_COALESCE_INTERVAL`] cadence, never from worker
/// threads directly, so callers get a coalesced event rate for free
/// without needing their own debouncing.
pub fn run_scan(
    containers: Vec<Container>,
    pool: &rayon::ThreadPool,
    cancel: Arc<AtomicBool>,
    on_progress: impl FnMut(ScanProgressSnapshot) + Send + 'static,
) -> ScanOutcome {
    let counters = Arc::new(ScanCounters {
        scanned_containers: AtomicUsize::new(0),
        asset_count: AtomicUsize::new(0),
        total_containers: containers.len(),
    });

    let monitor_done = Arc::new(AtomicBool::new(false));
    let monitor_counters = counters.clone();
    let monitor_done_for_thread = monitor_done.clone();
    let monitor_handle = thread::spawn(move || {
        while !monitor_done_for_thread.load(Ordering::Relaxed) {
            on_progress(ScanProgressSnapshot {
                scanned_containers: monitor_counters.scanned_containers.load(Ordering::Relaxed),
                total_containers: monitor_counters.total_containers,
                asset_count: monitor_counters.asset_count.load(Ordering::Relaxed),
            });
            thread::sleep(PROGRESS_COALESCE_INTERVAL);
        }
        on_progress(ScanProgressSnapshot {
            scanned_containers: monitor_counters.scanned_containers.load(Ordering::Relaxed),
            total_containers: monitor_counters.total_containers,
            asset_count: monitor_counters.asset_count.load(Ordering::Relaxed),
        });
        on_progress
    });

    let fingerprints = Arc::new(Mutex::new(HashMap::new()));
    let error_count = Arc::new(AtomicUsize::new(0));
    let cancel_for_pool = cancel.clone();

    let per_container_records: Vec<Vec<AssetRecord>> = pool.install(|| {
        containers
            .par_iter()
            .map(|container| {
                if cancel_for_pool.load(Ordering::SeqCst) {
                    return Vec::new();
                }

                let records = match open_reader(container)
                    .and_then(|reader| extract_container(container, &reader, &cancel_for_pool))
                {
                    Ok(result) => {
                        if result.skipped_entries > 0 {
                            log::debug!(
                                "{:?}: skipped {} malformed entries",
                                container.container_path,
                                result.skipped_entries
                            );
                        }
                        result.records
                    }
                    Err(e) => {
                        log::warn!("container failed, skipping: {:?}: {}", container.container_path, e);
                        error_count.fetch_add(1, Ordering::Relaxed);
                        Vec::new()
                    }
                };

                counters.asset_count.fetch_add(records.len(), Ordering::Relaxed);
                counters.scanned_containers.fetch_add(1, Ordering::Relaxed);

                let key = container.container_path.to_string_lossy().to_string();
                fingerprints
                    .lock()
                    .expect("fingerprint map mutex poisoned")
                    .insert(key, container.fingerprint.clone());

                records
            })
            .collect()
    });

    monitor_done.store(true, Ordering::Relaxed);
    let _ = monitor_handle.join();

    let cancelled = cancel.load(Ordering::SeqCst);
    let records = if cancelled {
        Vec::new()
    } else {
        per_container_records.into_iter().flatten().collect()
    };

    ScanOutcome {
        records,
        fingerprints: Arc::try_unwrap(fingerprints)
            .map(|m| m.into_inner().expect("fingerprint map mutex poisoned"))
            .unwrap_or_default(),
        cancelled,
        container_errors: error_count.load(Ordering::Relaxed),
    }
}
