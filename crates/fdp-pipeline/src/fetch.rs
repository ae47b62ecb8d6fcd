//! Dataset archive fetching
//!
//! Downloads the zipped source dataset from the dataset host. The
//! download is skipped entirely when the archive is already cached at its
//! expected path, so re-runs hit the network at most once per archive.
//! The stream is written to a partial file and renamed into place only
//! once complete, so the cache path never holds a truncated archive.
//! Credentials are passed in explicitly rather than through process-wide
//! environment mutation.

use crate::config::DataLayout;
use anyhow::Result;
use fdp_common::FdpError;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Dataset host credentials, threaded explicitly into the fetcher
#[derive(Debug, Clone)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl KaggleCredentials {
    /// Read credentials from `KAGGLE_USERNAME` / `KAGGLE_KEY`
    pub fn from_env() -> Result<Self> {
        let username = std::env::var("KAGGLE_USERNAME")
            .map_err(|_| FdpError::Config("KAGGLE_USERNAME is not set".to_string()))?;
        let key = std::env::var("KAGGLE_KEY")
            .map_err(|_| FdpError::Config("KAGGLE_KEY is not set".to_string()))?;
        Ok(Self { username, key })
    }
}

/// Downloads dataset archives into the local working directory
pub struct Fetcher {
    http: reqwest::Client,
    base_url: String,
    credentials: KaggleCredentials,
}

impl Fetcher {
    pub fn new(base_url: impl Into<String>, credentials: KaggleCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            credentials,
        }
    }

    /// Return the local archive path, downloading it if absent
    ///
    /// Also creates the working-directory scaffolding (csv and parquet
    /// subdirectories) on first run.
    pub async fn fetch(&self, dataset_slug: &str, layout: &DataLayout) -> Result<PathBuf> {
        layout.ensure_dirs()?;

        let archive_path = layout.archive_path();
        if archive_path.is_file() {
            info!(path = %archive_path.display(), "archive already present, skipping download");
            return Ok(archive_path);
        }

        let url = format!("{}/datasets/download/{}", self.base_url, dataset_slug);
        info!(dataset = dataset_slug, "downloading archive");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.key))
            .send()
            .await
            .map_err(|e| FdpError::Download {
                source_id: dataset_slug.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FdpError::Download {
                source_id: dataset_slug.to_string(),
                reason: format!("HTTP {}", response.status()),
            }
            .into());
        }

        let partial_path = archive_path.with_extension("zip.partial");
        let mut file = std::fs::File::create(&partial_path)?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = std::fs::remove_file(&partial_path);
                    return Err(FdpError::Download {
                        source_id: dataset_slug.to_string(),
                        reason: e.to_string(),
                    }
                    .into());
                },
            };
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
        }

        drop(file);
        std::fs::rename(&partial_path, &archive_path)?;

        debug!(bytes = downloaded, "archive download complete");
        info!(path = %archive_path.display(), "archive saved");
        Ok(archive_path)
    }
}
