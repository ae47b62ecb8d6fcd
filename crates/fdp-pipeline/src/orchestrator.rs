//! Pipeline orchestration
//!
//! Two-level flow. The inner flow takes one extracted CSV end to end:
//! read, clean, write parquet, upload, then load into the warehouse via
//! the configured strategy. The outer flow fetches and extracts the
//! archive, runs the inner flow sequentially per file, and only after
//! every table load has completed uploads and submits the distributed
//! fact-table job, which joins the loaded tables.
//!
//! Failures are fatal: there is no partial-failure recovery, and a run
//! that dies mid-dataset leaves local files and warehouse tables
//! partially populated. The only resumption markers are the cached
//! archive and already-created tables.

use crate::clean;
use crate::config::{LoadStrategy, PipelineConfig};
use crate::credentials::CredentialStore;
use crate::extract;
use crate::fetch::{Fetcher, KaggleCredentials};
use crate::jobs::JobSubmitter;
use crate::parquet;
use crate::storage::{config::StorageConfig, Storage};
use crate::table::{sanitize_table_id, Table};
use crate::warehouse::{registrar, schema, writer, TableId, WarehouseClient};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Fetcher,
    storage: Storage,
    warehouse: WarehouseClient,
    submitter: Option<JobSubmitter>,
}

impl Pipeline {
    /// Wire up all collaborators from configuration and the credential store
    pub async fn new(config: PipelineConfig) -> Result<Self> {
        let kaggle = KaggleCredentials::from_env()?;
        let store = CredentialStore::from_env();

        let warehouse_creds = store
            .load_warehouse(&config.credential_refs.warehouse)
            .context("Failed to load warehouse credentials")?;
        let bucket_creds = store
            .load_bucket(&config.credential_refs.bucket)
            .context("Failed to load bucket credentials")?;

        let fetcher = Fetcher::new(config.kaggle_base_url.clone(), kaggle);
        let storage = Storage::new(StorageConfig::from_credentials(
            config.bucket.clone(),
            &bucket_creds,
            config.upload_max_retries,
            config.upload_timeout_secs,
        ));
        let warehouse = WarehouseClient::new(
            config.warehouse_base_url.clone(),
            Some(warehouse_creds.token.clone()),
        );
        let submitter = config.submit_spark_job.then(|| {
            JobSubmitter::new(
                config.dataproc_base_url.clone(),
                config.project_id.clone(),
                config.region.clone(),
                config.cluster_name.clone(),
                Some(warehouse_creds.token),
                config.job_poll_interval(),
                config.job_wait_timeout(),
            )
        });

        Ok(Self {
            config,
            fetcher,
            storage,
            warehouse,
            submitter,
        })
    }

    /// Assemble a pipeline from already-built collaborators
    pub fn from_parts(
        config: PipelineConfig,
        fetcher: Fetcher,
        storage: Storage,
        warehouse: WarehouseClient,
        submitter: Option<JobSubmitter>,
    ) -> Self {
        Self {
            config,
            fetcher,
            storage,
            warehouse,
            submitter,
        }
    }

    /// Run the full pipeline for one dataset
    pub async fn run(&self, dataset_slug: &str) -> Result<()> {
        info!(dataset = dataset_slug, "starting pipeline run");

        let archive = self.fetcher.fetch(dataset_slug, &self.config.layout).await?;
        let csv_files = extract::extract_archive(&archive, &self.config.layout.csv_dir())?;
        info!(tables = csv_files.len(), "processing extracted tables");

        for csv_path in &csv_files {
            self.process_file(csv_path).await?;
        }

        // The fact-table job joins the loaded tables, so it must only run
        // after every per-file load has completed.
        if let Some(submitter) = &self.submitter {
            self.submit_fact_job(submitter).await?;
        }

        info!(dataset = dataset_slug, "pipeline run complete");
        Ok(())
    }

    /// Inner flow: one CSV from disk to a loaded warehouse table
    async fn process_file(&self, csv_path: &Path) -> Result<()> {
        info!(file = %csv_path.display(), "processing table");

        let mut table = Table::from_csv(csv_path)?;
        clean::clean(&mut table, &self.config.clean);

        let parquet_path = parquet::write_parquet(&table, &self.config.layout.parquet_dir())?;
        let file_name = parquet_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let key = self.config.parquet_key(&file_name);
        let upload = self.storage.upload_file(&parquet_path, &key).await?;

        let table_id = TableId::new(
            self.config.project_id.clone(),
            self.config.dataset_id.clone(),
            sanitize_table_id(&table.name),
        );

        match self.config.load_strategy {
            LoadStrategy::DirectAppend => {
                schema::ensure_table(&self.warehouse, &table_id, &table).await?;
                writer::append_rows(
                    &self.warehouse,
                    &table_id,
                    &table,
                    self.config.append_batch_rows,
                )
                .await?;
            },
            LoadStrategy::ExternalMaterialize => {
                let object_uri = self.storage.object_uri(&upload.key);
                registrar::register_external(&self.warehouse, &table_id, &object_uri).await?;
                registrar::materialize(&self.warehouse, &table_id).await?;
            },
        }

        info!(table = %table_id, rows = table.num_rows(), "table loaded");
        Ok(())
    }

    /// Upload the job script and submit the distributed join job
    async fn submit_fact_job(&self, submitter: &JobSubmitter) -> Result<()> {
        let script_path = self.config.spark_job_path();
        let key = self.config.spark_job_key();
        self.storage.upload_file(&script_path, &key).await?;

        let script_uri = self.storage.object_uri(&key);
        submitter
            .run(
                &script_uri,
                &self.config.dependency_jar_uri,
                self.config.job_failure_fatal,
            )
            .await?;
        Ok(())
    }
}
