//! Distributed job submission
//!
//! Submits the PySpark fact-table job to the cluster's job API and polls
//! until it reaches a terminal state, bounded by a wall-clock deadline.
//! A non-success terminal state fails the run when `job_failure_fatal`
//! is set (the default); the legacy log-only behavior is available by
//! turning that flag off.

use anyhow::Result;
use fdp_common::FdpError;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct JobReference {
    #[serde(rename = "jobId")]
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    state: String,
}

#[derive(Debug, Deserialize)]
struct Job {
    reference: JobReference,
    #[serde(default)]
    status: Option<JobStatus>,
}

fn is_terminal(state: &str) -> bool {
    matches!(state, "DONE" | "ERROR" | "CANCELLED")
}

/// Submits PySpark jobs to the cluster and tracks them to completion
pub struct JobSubmitter {
    http: reqwest::Client,
    base_url: String,
    project: String,
    region: String,
    cluster: String,
    token: Option<String>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl JobSubmitter {
    pub fn new(
        base_url: impl Into<String>,
        project: impl Into<String>,
        region: impl Into<String>,
        cluster: impl Into<String>,
        token: Option<String>,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            project: project.into(),
            region: region.into(),
            cluster: cluster.into(),
            token,
            poll_interval,
            max_wait,
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn jobs_url(&self) -> String {
        format!(
            "{}/projects/{}/regions/{}/jobs",
            self.base_url, self.project, self.region
        )
    }

    /// Submit the job, naming the uploaded script and the dependency jar
    pub async fn submit_pyspark(&self, script_uri: &str, jar_uri: &str) -> Result<String> {
        let body = json!({
            "job": {
                "placement": { "clusterName": self.cluster },
                "pysparkJob": {
                    "mainPythonFileUri": script_uri,
                    "jarFileUris": [jar_uri],
                },
            },
        });

        let response = self
            .authorized(self.http.post(format!("{}:submit", self.jobs_url())))
            .json(&body)
            .send()
            .await
            .map_err(|e| FdpError::JobApi(format!("job submission failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FdpError::JobApi(format!(
                "job submission failed: HTTP {}",
                response.status()
            ))
            .into());
        }

        let job: Job = response
            .json()
            .await
            .map_err(|e| FdpError::JobApi(format!("job submission response: {}", e)))?;
        info!(job_id = %job.reference.job_id, cluster = %self.cluster, "submitted pyspark job");
        Ok(job.reference.job_id)
    }

    /// Poll until the job reaches a terminal state, returning that state
    ///
    /// Gives up with `JobTimeout` once the job has spent `max_wait` in
    /// non-terminal states.
    pub async fn wait_for_completion(&self, job_id: &str) -> Result<String> {
        let started = tokio::time::Instant::now();
        loop {
            let response = self
                .authorized(self.http.get(format!("{}/{}", self.jobs_url(), job_id)))
                .send()
                .await
                .map_err(|e| FdpError::JobApi(format!("job status poll failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(FdpError::JobApi(format!(
                    "job status poll failed: HTTP {}",
                    response.status()
                ))
                .into());
            }

            let job: Job = response
                .json()
                .await
                .map_err(|e| FdpError::JobApi(format!("job status response: {}", e)))?;
            let state = job
                .status
                .map(|s| s.state)
                .unwrap_or_else(|| "PENDING".to_string());

            if is_terminal(&state) {
                return Ok(state);
            }
            if started.elapsed() >= self.max_wait {
                return Err(FdpError::JobTimeout {
                    job_id: job_id.to_string(),
                    waited_secs: self.max_wait.as_secs(),
                }
                .into());
            }
            debug!(job_id, state = %state, "job still running");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Submit and track a job; a non-success terminal state is fatal when
    /// `fatal` is set, otherwise only logged
    pub async fn run(&self, script_uri: &str, jar_uri: &str, fatal: bool) -> Result<String> {
        let job_id = self.submit_pyspark(script_uri, jar_uri).await?;
        let state = self.wait_for_completion(&job_id).await?;

        if state == "DONE" {
            info!(job_id = %job_id, "job completed");
        } else if fatal {
            return Err(FdpError::JobFailed {
                job_id,
                state,
            }
            .into());
        } else {
            warn!(job_id = %job_id, state = %state, "job finished in non-success state");
        }
        Ok(state)
    }
}
