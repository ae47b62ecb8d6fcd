//! Error types for FDP

use thiserror::Error;

/// Result type alias for FDP operations
pub type Result<T> = std::result::Result<T, FdpError>;

/// Main error type for FDP
#[derive(Error, Debug)]
pub enum FdpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Download failed for {source_id}: {reason}")]
    Download { source_id: String, reason: String },

    #[error("Archive is corrupt or unreadable: {0}")]
    ArchiveCorrupt(String),

    #[error("CSV error in {path}: {reason}")]
    Csv { path: String, reason: String },

    #[error("Column '{column}' has native type {kind} with no warehouse type mapping")]
    UnsupportedColumnType { column: String, kind: String },

    #[error("Table lookup failed for {table}: {reason}")]
    TableLookup { table: String, reason: String },

    #[error("Warehouse operation failed: {0}")]
    Warehouse(String),

    #[error("Upload failed for {key} after {attempts} attempts: {reason}")]
    Upload {
        key: String,
        attempts: u32,
        reason: String,
    },

    #[error("Job API request failed: {0}")]
    JobApi(String),

    #[error("Job {job_id} finished in state {state}")]
    JobFailed { job_id: String, state: String },

    #[error("Job {job_id} did not reach a terminal state within {waited_secs}s")]
    JobTimeout { job_id: String, waited_secs: u64 },

    #[error("Credential block not found: {0}")]
    CredentialNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_column_type_message() {
        let err = FdpError::UnsupportedColumnType {
            column: "Distance".to_string(),
            kind: "float64".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Column 'Distance' has native type float64 with no warehouse type mapping"
        );
    }

    #[test]
    fn test_job_failed_message() {
        let err = FdpError::JobFailed {
            job_id: "job-42".to_string(),
            state: "ERROR".to_string(),
        };
        assert!(err.to_string().contains("job-42"));
        assert!(err.to_string().contains("ERROR"));
    }
}
