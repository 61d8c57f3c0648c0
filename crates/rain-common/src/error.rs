//! Error types for rainfall sync operations.

use thiserror::Error;

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;

/// Primary error type for the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    // === Per-cell conditions ===
    #[error("No upstream station mapped for grid cell: {0}")]
    MappingNotFound(String),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Failed to parse {what}: {value}")]
    Parse { what: &'static str, value: String },

    // === Store errors ===
    #[error("Data access error: {0}")]
    DataAccess(String),

    // === Setup errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl SyncError {
    /// Whether this error only concerns a single grid cell.
    ///
    /// Cell-local errors mark the cell skipped; anything else marks it
    /// failed.
    pub fn is_cell_local(&self) -> bool {
        matches!(
            self,
            SyncError::MappingNotFound(_) | SyncError::Resample(_) | SyncError::Parse { .. }
        )
    }

    pub fn parse(what: &'static str, value: impl Into<String>) -> Self {
        SyncError::Parse {
            what,
            value: value.into(),
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::InvalidConfig(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_local_classification() {
        assert!(SyncError::MappingNotFound("flo2d_250_1_MDPA".into()).is_cell_local());
        assert!(SyncError::Resample("out of order".into()).is_cell_local());
        assert!(SyncError::parse("timestamp", "yesterday").is_cell_local());
        assert!(!SyncError::DataAccess("connection refused".into()).is_cell_local());
        assert!(!SyncError::InvalidConfig("missing sources".into()).is_cell_local());
    }

    #[test]
    fn test_parse_error_message() {
        let err = SyncError::parse("latitude", "abc");
        assert_eq!(err.to_string(), "Failed to parse latitude: abc");
    }
}
