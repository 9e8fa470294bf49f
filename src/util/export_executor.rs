/// Export executor: drives `save_assets`/`copy_assets_to_clipboard`
/// over a resolved asset list, one item at a time, honoring cancellation and
/// accumulating per-item failures instead of aborting on the first one.
use crate::config::clipboard_staging_root;
use crate::model::{AssetRecord, AudioFormat, ExportFailure};
use crate::util::{audio_transcoder, preview::open_reader_for};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub enum ExportDestination<'a> {
    Save { destination_dir: &'a Path },
    Clipboard,
}

pub struct ExportOutcome {
    pub processed_count: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub failures: Vec<ExportFailure>,
    pub cancelled: bool,
    /// Absolute file paths written, in order — the clipboard caller needs
    /// these to build the OS file-list payload.
    pub written_paths: Vec<PathBuf>,
}

/// Runs the shared save/copy loop. `on_progress` is called after every item
/// so the caller can emit a coalesced `export://progress` event.
pub fn run_export(
    records: &[(String, AssetRecord)],
    destination: ExportDestination,
    audio_format: AudioFormat,
    cancel: &Arc<AtomicBool>,
    mut on_progress: impl FnMut(usize, usize, usize),
) -> anyhow::Result<ExportOutcome> {
    let staging_root = match destination {
        ExportDestination::Clipboard => Some(clipboard_staging_root()?),
        ExportDestination::Save { .. } => None,
    };

    let mut processed_count = 0;
    let mut success_count = 0;
    let mut failures = Vec::new();
    let mut written_paths = Vec::new();
    let mut cancelled = false;

    for (asset_id, record) in records {
        if cancel.load(Ordering::SeqCst) {
            cancelled = true;
            break;
        }

        processed_count += 1;
        match export_one(record, &destination, staging_root.as_deref(), audio_format) {
            Ok(path) => {
                success_count += 1;
                written_paths.push(path);
            }
            Err(e) => failures.push(ExportFailure {
                asset_id: asset_id.clone(),
                key: record.key.clone(),
                error: e.to_string(),
            }),
        }
        on_progress(processed_count, success_count, failures.len());
    }

    Ok(ExportOutcome {
        processed_count,
        success_count,
        failed_count: failures.len(),
        failures,
        cancelled,
        written_paths,
    })
}

fn export_one(
    record: &AssetRecord,
    destination: &ExportDestination,
    staging_root: Option<&Path>,
    audio_format: AudioFormat,
) -> anyhow::Result<PathBuf> {
    let reader = open_reader_for(record)?;
    let bytes = reader.read(&record.entry_path)?;

    let (final_bytes, extension) = if record.is_audio && audio_format != AudioFormat::Original {
        let transcoded = audio_transcoder::transcode(bytes, audio_format)?;
        (transcoded, audio_transcoder::extension_for(audio_format).to_string())
    } else {
        (bytes, record.extension.clone())
    };

    let relative_dir = Path::new(&record.relative_asset_path)
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();
    let file_stem = Path::new(&record.relative_asset_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "asset".to_string());
    let file_name = if extension.is_empty() {
        file_stem
    } else {
        format!("{}.{}", file_stem, extension)
    };

    let root = match destination {
        ExportDestination::Save { destination_dir } => destination_dir.to_path_buf(),
        ExportDestination::Clipboard => staging_root
            .map(|p| p.to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("clipboard staging root missing"))?,
    };

    let source_segment = match record.source_type {
        crate::model::SourceType::Vanilla => "vanilla",
        crate::model::SourceType::Mod => "mods",
        crate::model::SourceType::ResourcePack => "resourcepacks",
    };
    let out_dir = root
        .join(source_segment)
        .join(&record.source_name)
        .join(&record.namespace)
        .join(&relative_dir);
    std::fs::create_dir_all(&out_dir)?;

    let out_path = out_dir.join(file_name);
    std::fs::write(&out_path, final_bytes)?;
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContainerType;

    fn record(source_name: &str, relative_asset_path: &str, container_path: PathBuf) -> AssetRecord {
        AssetRecord {
            asset_id: "abc".into(),
            key: format!("{} / minecraft / {}", source_name, relative_asset_path),
            key_lower: String::new(),
            source_type: crate::model::SourceType::ResourcePack,
            source_name: source_name.to_string(),
            namespace: "minecraft".into(),
            relative_asset_path: relative_asset_path.to_string(),
            extension: relative_asset_path.rsplit('.').next().unwrap_or("").to_string(),
            is_image: true,
            is_audio: false,
            container_path,
            container_type: ContainerType::Directory,
            entry_path: format!("assets/minecraft/{}", relative_asset_path),
        }
    }

    #[test]
    fn test_run_export_writes_files_and_reports_success() {
        let source_dir = std::env::temp_dir().join("prism_test_export_source");
        std::fs::create_dir_all(&source_dir).unwrap();
        std::fs::write(source_dir.join("stone.png"), b"fake-png").unwrap();

        let dest_dir = std::env::temp_dir().join("prism_test_export_dest");
        std::fs::create_dir_all(&dest_dir).ok();

        let records = vec![(
            "abc".to_string(),
            record("Pack", "stone.png", source_dir.clone()),
        )];
        let cancel = Arc::new(AtomicBool::new(false));

        let outcome = run_export(
            &records,
            ExportDestination::Save {
                destination_dir: &dest_dir,
            },
            AudioFormat::Original,
            &cancel,
            |_, _, _| {},
        )
        .unwrap();

        let written = outcome.written_paths.clone();
        std::fs::remove_dir_all(&source_dir).ok();
        std::fs::remove_dir_all(&dest_dir).ok();

        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.failed_count, 0);
        assert!(!outcome.cancelled);
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("resourcepacks/Pack/minecraft/stone.png"));
    }

    #[test]
    fn test_run_export_reports_failure_for_unreadable_asset() {
        let dest_dir = std::env::temp_dir().join("prism_test_export_dest_fail");
        let records = vec![(
            "missing".to_string(),
            record("Pack", "missing.png", PathBuf::from("/nonexistent/source/dir")),
        )];
        let cancel = Arc::new(AtomicBool::new(false));

        let outcome = run_export(
            &records,
            ExportDestination::Save {
                destination_dir: &dest_dir,
            },
            AudioFormat::Original,
            &cancel,
            |_, _, _| {},
        )
        .unwrap();
        std::fs::remove_dir_all(&dest_dir).ok();

        assert_eq!(outcome.failed_count, 1);
        assert_eq!(outcome.failures[0].asset_id, "missing");
    }

    #[test]
    fn test_run_export_stops_when_cancelled_before_start() {
        let dest_dir = std::env::temp_dir().join("prism_test_export_cancelled");
        let records = vec![(
            "abc".to_string(),
            record("Pack", "stone.png", PathBuf::from("/unused")),
        )];
        let cancel = Arc::new(AtomicBool::new(true));

        let outcome = run_export(
            &records,
            ExportDestination::Save {
                destination_dir: &dest_dir,
            },
            AudioFormat::Original,
            &cancel,
            |_, _, _| {},
        )
        .unwrap();
        std::fs::remove_dir_all(&dest_dir).ok();

        assert!(outcome.cancelled);
        assert_eq!(outcome.processed_count, 0);
    }
}
