//! FDP - flight data pipeline runner

use anyhow::Result;
use clap::Parser;
use fdp_common::logging::{init_logging, LogConfig, LogLevel};
use fdp_pipeline::config::{DataLayout, PipelineConfig};
use fdp_pipeline::orchestrator::Pipeline;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fdp")]
#[command(author, version, about = "Flight data ETL pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the pipeline for one dataset
    Run {
        /// Dataset identifier on the dataset host (owner/slug)
        #[arg(short, long, default_value = "salikhussaini49/flight-data")]
        dataset: String,

        /// Load strategy override (direct_append or external_materialize)
        #[arg(short, long)]
        strategy: Option<String>,

        /// Working directory override
        #[arg(long)]
        data_dir: Option<String>,

        /// Skip the distributed fact-table job
        #[arg(long)]
        skip_spark_job: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?;
    if cli.verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }
    init_logging(&log_config)?;

    match cli.command {
        Command::Run {
            dataset,
            strategy,
            data_dir,
            skip_spark_job,
        } => {
            let mut config = PipelineConfig::from_env()?;
            if let Some(strategy) = strategy {
                config.load_strategy = strategy.parse()?;
            }
            if let Some(data_dir) = data_dir {
                config.layout = DataLayout::new(data_dir);
            }
            if skip_spark_job {
                config.submit_spark_job = false;
            }

            let pipeline = Pipeline::new(config).await?;
            pipeline.run(&dataset).await?;
        },
    }

    info!("done");
    Ok(())
}
