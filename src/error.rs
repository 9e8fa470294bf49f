/**
 * Application error type for Tauri commands
 *
 * This implements the modern Tauri v2 pattern of custom error types
 * that automatically serialize to JSON for frontend consumption.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl AppError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    /// Missing launcher root, missing instance, or an empty source selection.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new("ConfigError", message)
    }

    /// Unreadable instance tree. Fatal to the scan.
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::new("DiscoveryError", message)
    }

    /// A single container failed (bad archive, missing asset index). Non-fatal.
    pub fn container(message: impl Into<String>) -> Self {
        Self::new("ContainerError", message)
    }

    /// A single entry failed to read.
    pub fn read(message: impl Into<String>) -> Self {
        Self::new("ReadError", message)
    }

    /// Audio transcode failed for one export item.
    pub fn transcode(message: impl Into<String>) -> Self {
        Self::new("TranscodeError", message)
    }

    /// Cache snapshot read/write failure. Always downgraded to a cache miss.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new("CacheError", message)
    }

    /// A command referenced an unknown scanId, assetId, or operationId.
    pub fn state(message: impl Into<String>) -> Self {
        Self::new("StateError", message)
    }

    /// A preview was refused because it exceeds the size cap.
    pub fn preview_too_large(message: impl Into<String>) -> Self {
        Self::new("PreviewTooLarge", message)
    }

    /// Attach more context to the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::container(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::read(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::cache(format!("serialization failed: {}", err))
    }
}

/// Type alias for Results in this application
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = AppError::config("instance folder is missing");
        assert_eq!(err.code, "ConfigError");
        assert_eq!(err.message, "instance folder is missing");
        assert_eq!(err.details, None);
    }

    #[test]
    fn test_container_error() {
        let err = AppError::container("bad archive");
        assert_eq!(err.code, "ContainerError");
    }

    #[test]
    fn test_preview_too_large() {
        let err = AppError::preview_too_large("20971520 bytes > 16 MiB cap");
        assert_eq!(err.code, "PreviewTooLarge");
    }

    #[test]
    fn test_with_details() {
        let err = AppError::state("unknown scanId").with_details("abc-123");
        assert_eq!(err.code, "StateError");
        assert_eq!(err.details, Some("abc-123".to_string()));
    }

    #[test]
    fn test_display() {
        let err = AppError::config("test message");
        assert_eq!(err.to_string(), "ConfigError: test message");
    }

    #[test]
    fn test_from_std_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert_eq!(app_err.code, "ReadError");
        assert!(app_err.message.contains("file not found"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let app_err: AppError = json_err.into();
        assert_eq!(app_err.code, "CacheError");
        assert!(app_err.details.is_none());
    }

    #[test]
    fn test_from_anyhow_error() {
        let anyhow_err = anyhow::anyhow!("archive is corrupt");
        let app_err: AppError = anyhow_err.into();
        assert_eq!(app_err.code, "ContainerError");
        assert_eq!(app_err.message, "archive is corrupt");
    }

    #[test]
    fn test_error_serialization() {
        let err = AppError::cache("write failed").with_details("disk full");
        let json = serde_json::to_string(&err).expect("should serialize");
        assert!(json.contains("\"code\":\"CacheError\""));
        assert!(json.contains("\"details\":\"disk full\""));
    }

    #[test]
    fn test_error_deserialization() {
        let json = r#"{"code":"ReadError","message":"test message","details":null}"#;
        let err: AppError = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(err.code, "ReadError");
        assert_eq!(err.message, "test message");
        assert_eq!(err.details, None);
    }

    #[test]
    fn test_error_clone() {
        let err1 = AppError::container("test error");
        let err2 = err1.clone();
        assert_eq!(err1.code, err2.code);
        assert_eq!(err1.message, err2.message);
    }
}
