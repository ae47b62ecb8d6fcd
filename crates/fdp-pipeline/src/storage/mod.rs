//! Object storage uploader
//!
//! Copies local files into the remote bucket. This is the most
//! failure-prone network hop in the pipeline, so it is the one component
//! with an explicit resilience policy: bounded retry attempts, each under
//! a generous wall-clock timeout. SDK-internal retries are disabled so
//! the policy here is the only one in effect.

use anyhow::{Context, Result};
use aws_sdk_s3::{
    config::{retry::RetryConfig, Credentials, Region},
    primitives::ByteStream,
    Client,
};
use fdp_common::FdpError;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub mod config;

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    max_retries: u32,
    attempt_timeout: Duration,
}

/// Outcome of a completed upload
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub key: String,
    pub checksum: String,
    pub size: i64,
}

impl Storage {
    pub fn new(config: config::StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "fdp-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled())
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());
        info!(bucket = %config.bucket, "storage client initialized");

        let attempt_timeout = config.attempt_timeout();
        Self {
            client,
            bucket: config.bucket,
            max_retries: config.max_retries,
            attempt_timeout,
        }
    }

    /// Upload a local file to `key`, retrying transient failures
    pub async fn upload_file(&self, local_path: &Path, key: &str) -> Result<UploadResult> {
        let data = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;
        let checksum = fdp_common::checksum::sha256_bytes(&data);
        let size = data.len() as i64;

        debug!(bytes = size, key, bucket = %self.bucket, "starting upload");

        let mut last_error = String::new();
        for attempt in 1..=self.max_retries {
            let request = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(data.clone()))
                .send();

            match tokio::time::timeout(self.attempt_timeout, request).await {
                Ok(Ok(_)) => {
                    info!(key, checksum = %checksum, bytes = size, "upload complete");
                    return Ok(UploadResult {
                        key: key.to_string(),
                        checksum,
                        size,
                    });
                },
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    warn!(key, attempt, error = %last_error, "upload attempt failed");
                },
                Err(_) => {
                    last_error = format!("timed out after {:?}", self.attempt_timeout);
                    warn!(key, attempt, "upload attempt timed out");
                },
            }
        }

        Err(FdpError::Upload {
            key: key.to_string(),
            attempts: self.max_retries,
            reason: last_error,
        }
        .into())
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `gs://`-style URI for a key, used in external table DDL
    pub fn object_uri(&self, key: &str) -> String {
        format!("gs://{}/{}", self.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_storage(endpoint: &str) -> Storage {
        Storage::new(config::StorageConfig::for_endpoint(endpoint, "test-bucket"))
    }

    fn write_local_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("airports.parquet");
        std::fs::write(&path, b"columnar bytes").unwrap();
        path
    }

    #[tokio::test]
    async fn test_upload_file() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/test-bucket/flights/dataset/parquets/airports.parquet"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let local = write_local_file(&dir);
        let storage = test_storage(&server.uri());

        let result = storage
            .upload_file(&local, "flights/dataset/parquets/airports.parquet")
            .await
            .unwrap();
        assert_eq!(result.size, 14);
        assert_eq!(result.checksum, fdp_common::checksum::sha256_bytes(b"columnar bytes"));
    }

    #[tokio::test]
    async fn test_upload_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let local = write_local_file(&dir);
        let storage = test_storage(&server.uri());

        storage.upload_file(&local, "key").await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let local = write_local_file(&dir);
        let storage = test_storage(&server.uri());

        let err = storage.upload_file(&local, "key").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FdpError>(),
            Some(FdpError::Upload { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_honors_attempt_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(250)))
            .mount(&server)
            .await;

        let mut config = config::StorageConfig::for_endpoint(server.uri(), "test-bucket");
        config.max_retries = 2;
        config.attempt_timeout_secs = 0;
        let storage = Storage::new(config);

        let dir = tempfile::tempdir().unwrap();
        let local = write_local_file(&dir);
        let err = storage.upload_file(&local, "key").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FdpError>(),
            Some(FdpError::Upload { attempts: 2, .. })
        ));
    }

    #[test]
    fn test_object_uri() {
        let storage = test_storage("http://localhost:9000");
        assert_eq!(
            storage.object_uri("flights/dataset/parquets/airports.parquet"),
            "gs://test-bucket/flights/dataset/parquets/airports.parquet"
        );
    }
}
