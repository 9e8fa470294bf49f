use crate::error::AppResult;
/**
 * Input validation utilities for Tauri commands
 *
 * Provides a DRY way to validate all command inputs before processing.
 * Enables centralized, reusable validation logic.
 */
use std::path::Path;

/// Validates a directory path exists and is readable
pub fn validate_directory(path: &str, label: &str) -> AppResult<()> {
    if path.is_empty() {
        return Err(crate::error::AppError::config(format!(
            "{} cannot be empty",
            label
        )));
    }

    let p = Path::new(path);
    if !p.exists() {
        return Err(crate::error::AppError::config(format!(
            "{} does not exist: {}",
            label, path
        )));
    }

    if !p.is_dir() {
        return Err(crate::error::AppError::config(format!(
            "{} is not a directory: {}",
            label, path
        )));
    }

    Ok(())
}

/// Validates that at least one source toggle is enabled: an empty
/// source selection is a `ConfigError`, not an empty-but-valid scan.
pub fn validate_source_selection(
    include_vanilla: bool,
    include_mods: bool,
    include_resourcepacks: bool,
) -> AppResult<()> {
    if !include_vanilla && !include_mods && !include_resourcepacks {
        return Err(crate::error::AppError::config(
            "at least one of includeVanilla, includeMods, includeResourcepacks must be true",
        ));
    }
    Ok(())
}

/// Validates a non-empty list of asset ids (used by exports and reconcile).
pub fn validate_asset_ids(asset_ids: &[String]) -> AppResult<()> {
    if asset_ids.is_empty() {
        return Err(crate::error::AppError::config("assetIds cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_directory_missing() {
        let result = validate_directory("/nonexistent/path/for/sure", "Instance folder");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code, "ConfigError");
    }

    #[test]
    fn test_validate_directory_empty_string() {
        let result = validate_directory("", "Instance folder");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_source_selection_all_off() {
        let result = validate_source_selection(false, false, false);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_source_selection_one_on() {
        let result = validate_source_selection(false, true, false);
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_asset_ids_empty() {
        let result = validate_asset_ids(&[]);
        assert!(result.is_err());
    }
}
