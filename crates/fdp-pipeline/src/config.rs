//! Pipeline configuration
//!
//! All previously hardcoded identity (project, dataset, cluster, region,
//! credential block names, dependency jar) lives in [`PipelineConfig`],
//! loaded from environment variables with validated defaults. Service
//! base URLs are configurable so tests can point the HTTP clients at a
//! mock server.

use crate::clean::CleanPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How a cleaned table reaches the warehouse
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Create the table from the inferred schema if absent, then append
    /// rows through the streaming insert API
    DirectAppend,
    /// Register a file-backed external table, then materialize it into a
    /// native table with a copy query
    ExternalMaterialize,
}

impl std::str::FromStr for LoadStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "direct_append" => Ok(LoadStrategy::DirectAppend),
            "external_materialize" => Ok(LoadStrategy::ExternalMaterialize),
            _ => Err(anyhow::anyhow!(
                "Invalid load strategy: {}. Must be 'direct_append' or 'external_materialize'",
                s
            )),
        }
    }
}

/// Names of the credential blocks resolved through the credential store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRefs {
    /// Block holding the warehouse / job-submission token
    pub warehouse: String,
    /// Block holding the object storage keys
    pub bucket: String,
}

impl Default for CredentialRefs {
    fn default() -> Self {
        Self {
            warehouse: "flights-gcp-creds".to_string(),
            bucket: "flights-gcs".to_string(),
        }
    }
}

/// Local working-directory layout for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataLayout {
    /// Root working directory (default: `dataset`)
    pub root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path the downloaded archive is cached at
    pub fn archive_path(&self) -> PathBuf {
        self.root.join("flight-data.zip")
    }

    /// Directory extracted CSV files land in
    pub fn csv_dir(&self) -> PathBuf {
        self.root.join("csvs")
    }

    /// Directory parquet output is written to
    pub fn parquet_dir(&self) -> PathBuf {
        self.root.join("parquets")
    }

    /// Create the working-directory scaffolding if absent
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.csv_dir())?;
        std::fs::create_dir_all(self.parquet_dir())?;
        Ok(())
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new("dataset")
    }
}

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Warehouse project id
    pub project_id: String,
    /// Warehouse dataset (namespace) id
    pub dataset_id: String,
    /// Object storage bucket
    pub bucket: String,
    /// Remote key prefix mirroring the local layout (default: `flights`)
    pub remote_prefix: String,
    /// Cluster the distributed join job runs on
    pub cluster_name: String,
    /// Cluster region
    pub region: String,
    /// Dependency jar passed to the distributed job
    pub dependency_jar_uri: String,
    /// Named credential blocks
    pub credential_refs: CredentialRefs,
    /// Table load strategy
    pub load_strategy: LoadStrategy,
    /// Text-column cleaning policy
    pub clean: CleanPolicy,
    /// Local working directory layout
    pub layout: DataLayout,
    /// Local directory holding distributed job scripts
    pub spark_jobs_dir: PathBuf,
    /// Script submitted after all table loads complete
    pub spark_job_file: String,
    /// Whether to submit the distributed job at all
    pub submit_spark_job: bool,
    /// Whether a failed job state fails the pipeline run
    pub job_failure_fatal: bool,
    /// Row-count threshold for warehouse append batches
    pub append_batch_rows: usize,
    /// Upload retry attempts
    pub upload_max_retries: u32,
    /// Per-attempt upload timeout in seconds
    pub upload_timeout_secs: u64,
    /// Interval between job status polls in seconds
    pub job_poll_interval_secs: u64,
    /// Longest a submitted job may stay non-terminal before the run
    /// fails with a timeout, in seconds
    pub job_wait_timeout_secs: u64,
    /// Warehouse REST endpoint
    pub warehouse_base_url: String,
    /// Cluster job-submission REST endpoint
    pub dataproc_base_url: String,
    /// Dataset host REST endpoint
    pub kaggle_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset_id: "flights".to_string(),
            bucket: "de_flights".to_string(),
            remote_prefix: "flights".to_string(),
            cluster_name: "flights-cluster".to_string(),
            region: "europe-west1".to_string(),
            dependency_jar_uri:
                "gs://spark-lib/bigquery/spark-bigquery-latest_2.12.jar".to_string(),
            credential_refs: CredentialRefs::default(),
            load_strategy: LoadStrategy::ExternalMaterialize,
            clean: CleanPolicy::default(),
            layout: DataLayout::default(),
            spark_jobs_dir: PathBuf::from("spark_jobs"),
            spark_job_file: "fact_flights_job.py".to_string(),
            submit_spark_job: true,
            job_failure_fatal: true,
            append_batch_rows: 500_000,
            upload_max_retries: 3,
            upload_timeout_secs: 5000,
            job_poll_interval_secs: 10,
            job_wait_timeout_secs: 3600,
            warehouse_base_url: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
            dataproc_base_url: "https://dataproc.googleapis.com/v1".to_string(),
            kaggle_base_url: "https://www.kaggle.com/api/v1".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Every field has an `FDP_*` variable; unset variables keep the
    /// defaults. `FDP_PROJECT_ID` is the only one with no usable default.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("FDP_PROJECT_ID") {
            config.project_id = v;
        }
        if let Ok(v) = std::env::var("FDP_DATASET_ID") {
            config.dataset_id = v;
        }
        if let Ok(v) = std::env::var("FDP_BUCKET") {
            config.bucket = v;
        }
        if let Ok(v) = std::env::var("FDP_REMOTE_PREFIX") {
            config.remote_prefix = v;
        }
        if let Ok(v) = std::env::var("FDP_CLUSTER_NAME") {
            config.cluster_name = v;
        }
        if let Ok(v) = std::env::var("FDP_REGION") {
            config.region = v;
        }
        if let Ok(v) = std::env::var("FDP_DEPENDENCY_JAR_URI") {
            config.dependency_jar_uri = v;
        }
        if let Ok(v) = std::env::var("FDP_WAREHOUSE_CREDENTIAL_REF") {
            config.credential_refs.warehouse = v;
        }
        if let Ok(v) = std::env::var("FDP_BUCKET_CREDENTIAL_REF") {
            config.credential_refs.bucket = v;
        }
        if let Ok(v) = std::env::var("FDP_LOAD_STRATEGY") {
            config.load_strategy = v.parse()?;
        }
        if let Ok(v) = std::env::var("FDP_CLEAN_SENTINEL") {
            config.clean.sentinel = if v.is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = std::env::var("FDP_DATA_DIR") {
            config.layout = DataLayout::new(v);
        }
        if let Ok(v) = std::env::var("FDP_SPARK_JOBS_DIR") {
            config.spark_jobs_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("FDP_SPARK_JOB_FILE") {
            config.spark_job_file = v;
        }
        if let Ok(v) = std::env::var("FDP_SUBMIT_SPARK_JOB") {
            config.submit_spark_job = v.parse().unwrap_or(true);
        }
        if let Ok(v) = std::env::var("FDP_JOB_FAILURE_FATAL") {
            config.job_failure_fatal = v.parse().unwrap_or(true);
        }
        if let Ok(v) = std::env::var("FDP_APPEND_BATCH_ROWS") {
            config.append_batch_rows = v
                .parse()
                .map_err(|_| anyhow::anyhow!("FDP_APPEND_BATCH_ROWS must be a number"))?;
        }
        if let Ok(v) = std::env::var("FDP_UPLOAD_MAX_RETRIES") {
            config.upload_max_retries = v
                .parse()
                .map_err(|_| anyhow::anyhow!("FDP_UPLOAD_MAX_RETRIES must be a number"))?;
        }
        if let Ok(v) = std::env::var("FDP_UPLOAD_TIMEOUT_SECS") {
            config.upload_timeout_secs = v
                .parse()
                .map_err(|_| anyhow::anyhow!("FDP_UPLOAD_TIMEOUT_SECS must be a number"))?;
        }
        if let Ok(v) = std::env::var("FDP_JOB_POLL_INTERVAL_SECS") {
            config.job_poll_interval_secs = v
                .parse()
                .map_err(|_| anyhow::anyhow!("FDP_JOB_POLL_INTERVAL_SECS must be a number"))?;
        }
        if let Ok(v) = std::env::var("FDP_JOB_WAIT_TIMEOUT_SECS") {
            config.job_wait_timeout_secs = v
                .parse()
                .map_err(|_| anyhow::anyhow!("FDP_JOB_WAIT_TIMEOUT_SECS must be a number"))?;
        }
        if let Ok(v) = std::env::var("FDP_WAREHOUSE_BASE_URL") {
            config.warehouse_base_url = v;
        }
        if let Ok(v) = std::env::var("FDP_DATAPROC_BASE_URL") {
            config.dataproc_base_url = v;
        }
        if let Ok(v) = std::env::var("FDP_KAGGLE_BASE_URL") {
            config.kaggle_base_url = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project_id.is_empty() {
            anyhow::bail!("FDP_PROJECT_ID cannot be empty");
        }
        if self.dataset_id.is_empty() {
            anyhow::bail!("FDP_DATASET_ID cannot be empty");
        }
        if self.bucket.is_empty() {
            anyhow::bail!("FDP_BUCKET cannot be empty");
        }
        if self.append_batch_rows == 0 {
            anyhow::bail!("FDP_APPEND_BATCH_ROWS must be greater than 0");
        }
        if self.upload_max_retries == 0 {
            anyhow::bail!("FDP_UPLOAD_MAX_RETRIES must be greater than 0");
        }
        if self.submit_spark_job {
            if self.cluster_name.is_empty() {
                anyhow::bail!("FDP_CLUSTER_NAME cannot be empty when job submission is enabled");
            }
            if self.region.is_empty() {
                anyhow::bail!("FDP_REGION cannot be empty when job submission is enabled");
            }
        }
        Ok(())
    }

    /// Per-attempt upload timeout as a Duration
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    /// Job poll interval as a Duration
    pub fn job_poll_interval(&self) -> Duration {
        Duration::from_secs(self.job_poll_interval_secs)
    }

    /// Longest non-terminal job wait as a Duration
    pub fn job_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.job_wait_timeout_secs)
    }

    /// Local path of the distributed job script
    pub fn spark_job_path(&self) -> PathBuf {
        self.spark_jobs_dir.join(&self.spark_job_file)
    }

    /// Remote key for a parquet file, mirroring the canonical
    /// `dataset/parquets/...` layout under the remote prefix
    pub fn parquet_key(&self, file_name: &str) -> String {
        format!("{}/dataset/parquets/{}", self.remote_prefix, file_name)
    }

    /// Remote key for a distributed job script
    pub fn spark_job_key(&self) -> String {
        format!("{}/spark_jobs/{}", self.remote_prefix, self.spark_job_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PipelineConfig {
        PipelineConfig {
            project_id: "resolute-choir-403411".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.dataset_id, "flights");
        assert_eq!(config.append_batch_rows, 500_000);
        assert_eq!(config.upload_max_retries, 3);
        assert_eq!(config.load_strategy, LoadStrategy::ExternalMaterialize);
        assert_eq!(config.clean.sentinel.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_validation_requires_project() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validation_zero_batch_rows() {
        let mut config = valid_config();
        config.append_batch_rows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_cluster_only_when_submitting() {
        let mut config = valid_config();
        config.cluster_name = String::new();
        assert!(config.validate().is_err());

        config.submit_spark_job = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_strategy_from_str() {
        assert_eq!(
            "direct_append".parse::<LoadStrategy>().unwrap(),
            LoadStrategy::DirectAppend
        );
        assert_eq!(
            "external-materialize".parse::<LoadStrategy>().unwrap(),
            LoadStrategy::ExternalMaterialize
        );
        assert!("upsert".parse::<LoadStrategy>().is_err());
    }

    #[test]
    fn test_layout_paths() {
        let layout = DataLayout::default();
        assert_eq!(layout.archive_path(), PathBuf::from("dataset/flight-data.zip"));
        assert_eq!(layout.csv_dir(), PathBuf::from("dataset/csvs"));
        assert_eq!(layout.parquet_dir(), PathBuf::from("dataset/parquets"));
    }

    #[test]
    fn test_remote_keys_mirror_canonical_layout() {
        let config = valid_config();
        assert_eq!(
            config.parquet_key("airports.parquet"),
            "flights/dataset/parquets/airports.parquet"
        );
        assert_eq!(
            config.spark_job_key(),
            "flights/spark_jobs/fact_flights_job.py"
        );
    }

    #[test]
    fn test_timeouts() {
        let config = valid_config();
        assert_eq!(config.upload_timeout(), Duration::from_secs(5000));
        assert_eq!(config.job_poll_interval(), Duration::from_secs(10));
        assert_eq!(config.job_wait_timeout(), Duration::from_secs(3600));
    }
}
