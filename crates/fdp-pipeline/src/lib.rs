//! FDP Pipeline Library
//!
//! Batch ETL from a public dataset host into a cloud warehouse:
//!
//! 1. Fetch a zipped dataset archive (idempotent by local presence)
//! 2. Extract CSV tables
//! 3. Normalize column types
//! 4. Serialize each table to parquet
//! 5. Upload parquet files to object storage
//! 6. Load each table into the warehouse (direct append or
//!    external-table materialization)
//! 7. Submit a distributed Spark job that builds the denormalized
//!    fact table
//!
//! # Example
//!
//! ```no_run
//! use fdp_pipeline::{config::PipelineConfig, orchestrator::Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::from_env()?;
//!     let pipeline = Pipeline::new(config).await?;
//!     pipeline.run("salikhussaini49/flight-data").await?;
//!     Ok(())
//! }
//! ```

pub mod clean;
pub mod config;
pub mod credentials;
pub mod extract;
pub mod fetch;
pub mod jobs;
pub mod orchestrator;
pub mod parquet;
pub mod storage;
pub mod table;
pub mod warehouse;
