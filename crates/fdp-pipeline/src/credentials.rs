//! Named credential blocks
//!
//! Credentials are provisioned out of band and loaded here by block name,
//! one JSON file per block under the credential directory. Environment
//! variables override file contents so containerized runs need no files
//! on disk. Two blocks are consumed per run: one for the warehouse (and
//! job submission), one for the object storage bucket.

use anyhow::Result;
use fdp_common::FdpError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Warehouse and job-submission credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseCredentials {
    /// Bearer token presented to the warehouse and cluster APIs
    pub token: String,
}

/// Object storage credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketCredentials {
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores; `None` means AWS
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Loads credential blocks by name from a directory of JSON files
#[derive(Debug, Clone)]
pub struct CredentialStore {
    root: PathBuf,
}

impl CredentialStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Credential directory from `FDP_CREDENTIALS_DIR`, default `./credentials`
    pub fn from_env() -> Self {
        let root = std::env::var("FDP_CREDENTIALS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("credentials"));
        Self::new(root)
    }

    /// Load the warehouse block; `FDP_WAREHOUSE_TOKEN` overrides the file
    pub fn load_warehouse(&self, name: &str) -> Result<WarehouseCredentials> {
        if let Ok(token) = std::env::var("FDP_WAREHOUSE_TOKEN") {
            debug!(block = name, "warehouse credentials taken from environment");
            return Ok(WarehouseCredentials { token });
        }
        self.load_block(name)
    }

    /// Load the bucket block; `S3_ACCESS_KEY`/`S3_SECRET_KEY` override the file
    pub fn load_bucket(&self, name: &str) -> Result<BucketCredentials> {
        let access_key = std::env::var("S3_ACCESS_KEY").ok();
        let secret_key = std::env::var("S3_SECRET_KEY").ok();
        if let (Some(access_key), Some(secret_key)) = (access_key, secret_key) {
            debug!(block = name, "bucket credentials taken from environment");
            return Ok(BucketCredentials {
                access_key,
                secret_key,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| default_region()),
                endpoint: std::env::var("S3_ENDPOINT").ok(),
            });
        }
        self.load_block(name)
    }

    fn load_block<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.root.join(format!("{}.json", name));
        if !path.is_file() {
            return Err(FdpError::CredentialNotFound(name.to_string()).into());
        }
        let contents = std::fs::read_to_string(&path)?;
        let block = serde_json::from_str(&contents)?;
        debug!(block = name, path = %path.display(), "loaded credential block");
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_bucket_block_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("flights-gcs.json"),
            r#"{"access_key": "ak", "secret_key": "sk", "endpoint": "http://localhost:9000"}"#,
        )
        .unwrap();

        let store = CredentialStore::new(dir.path());
        let creds = store.load_bucket("flights-gcs").unwrap();
        assert_eq!(creds.access_key, "ak");
        assert_eq!(creds.region, "us-east-1");
        assert_eq!(creds.endpoint.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_load_warehouse_block_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("flights-gcp-creds.json"),
            r#"{"token": "ya29.secret"}"#,
        )
        .unwrap();

        let store = CredentialStore::new(dir.path());
        let creds = store.load_warehouse("flights-gcp-creds").unwrap();
        assert_eq!(creds.token, "ya29.secret");
    }

    #[test]
    fn test_missing_block_is_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let err = store.load_warehouse("nope").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FdpError>(),
            Some(FdpError::CredentialNotFound(name)) if name == "nope"
        ));
    }
}
