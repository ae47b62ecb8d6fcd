//! Object storage configuration

use crate::credentials::BucketCredentials;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
    /// Bounded retry attempts for uploads
    pub max_retries: u32,
    /// Per-attempt wall-clock timeout in seconds; generous because parquet
    /// uploads can be large and the link slow
    pub attempt_timeout_secs: u64,
}

impl StorageConfig {
    /// Build from a resolved bucket credential block
    pub fn from_credentials(
        bucket: impl Into<String>,
        creds: &BucketCredentials,
        max_retries: u32,
        attempt_timeout_secs: u64,
    ) -> Self {
        Self {
            endpoint: creds.endpoint.clone(),
            region: creds.region.clone(),
            bucket: bucket.into(),
            access_key: creds.access_key.clone(),
            secret_key: creds.secret_key.clone(),
            // Custom endpoints (MinIO, interop gateways) want path-style keys
            path_style: creds.endpoint.is_some(),
            max_retries,
            attempt_timeout_secs,
        }
    }

    /// Local MinIO-style config, used by tests
    pub fn for_endpoint(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: "us-east-1".to_string(),
            bucket: bucket.into(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            path_style: true,
            max_retries: 3,
            attempt_timeout_secs: 5000,
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}
