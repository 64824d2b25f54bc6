//! Job submission and tracking against the console jobs API.
//!
//! A job is created with one POST, then owned entirely by the console; this
//! module only reads its state and, on interruption, asks once for a cancel.
use crate::api::types::{JobExecution, JobStarted, JobType, LogPage, ModuleGenerationType};
use crate::api::{ApiClient, ApiError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

mod poll;

pub use poll::{CancelToken, JobPoller, PendingPoller, PollOutcome};

// Workflow step names, ordered as the console runs them.
pub const STEP_ACCEPT: &str = "accept";
pub const STEP_ANALYZE: &str = "analyze";
pub const STEP_SNAPSHOT: &str = "snapshot";
pub const STEP_SNAPSHOT_INDICATOR: &str = "snapshot_indicator";
pub const STEP_CONSOLIDATE_SNAPSHOT: &str = "consolidate_snapshot";
pub const STEP_UPLOAD_SNAPSHOT: &str = "upload_snapshot";

const RELEASE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Wire shape of a job submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub job_type: JobType,
    pub job_parameters: BTreeMap<String, Value>,
}

/// Assembles the `jobParameters` map one meaningful field at a time.
#[derive(Debug)]
pub struct JobRequestBuilder {
    job_type: JobType,
    parameters: BTreeMap<String, Value>,
}

impl JobRequestBuilder {
    pub fn new(app_guid: &str, job_type: JobType) -> Self {
        let mut builder = JobRequestBuilder {
            job_type,
            parameters: BTreeMap::new(),
        };
        if !app_guid.is_empty() {
            builder.set("appGuid", app_guid);
        }
        builder
    }

    fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.parameters.insert(key.to_string(), value.into());
    }

    pub fn start_step(mut self, step: &str) -> Self {
        self.set("startStep", step);
        self
    }

    pub fn end_step(mut self, step: &str) -> Self {
        self.set("endStep", step);
        self
    }

    pub fn version_guid(mut self, guid: &str) -> Self {
        self.set("versionGuid", guid);
        self
    }

    pub fn version_name(mut self, name: &str) -> Self {
        self.set("versionName", name);
        self
    }

    pub fn snapshot_name(mut self, name: &str) -> Self {
        self.set("snapshotName", name);
        self
    }

    /// Stamp both the release and the snapshot date with the same instant.
    pub fn release_and_snapshot_date(mut self, date: DateTime<Utc>) -> Self {
        let formatted = date.format(RELEASE_DATE_FORMAT).to_string();
        self.set("releaseDate", formatted.clone());
        self.set("snapshotDate", formatted);
        self
    }

    pub fn node_name(mut self, node: &str) -> Self {
        self.set("nodeName", node);
        self
    }

    pub fn caip_version(mut self, caip: &str) -> Self {
        self.set("caipVersion", caip);
        self
    }

    pub fn app_name(mut self, name: &str) -> Self {
        self.set("appName", name);
        self
    }

    pub fn domain_name(mut self, domain: &str) -> Self {
        self.set("domainName", domain);
        self
    }

    pub fn source_path(mut self, path: &str) -> Self {
        self.set("sourcePath", path);
        self
    }

    pub fn delivery_config_guid(mut self, guid: &str) -> Self {
        self.set("deliveryConfigGuid", guid);
        self
    }

    pub fn module_generation_type(mut self, generation: ModuleGenerationType) -> Self {
        self.set("moduleGenerationType", generation.as_str());
        self
    }

    pub fn process_imaging(mut self, enabled: bool) -> Self {
        self.set("processImaging", enabled);
        self
    }

    pub fn upload_application(mut self, enabled: bool) -> Self {
        self.set("uploadApplication", enabled);
        self
    }

    pub fn publish_to_engineering(mut self, enabled: bool) -> Self {
        self.set("publishToEngineering", enabled);
        self
    }

    pub fn build(self) -> JobRequest {
        JobRequest {
            job_type: self.job_type,
            job_parameters: self.parameters,
        }
    }
}

/// Poll cadence and verbosity shared by every command.
#[derive(Debug, Clone)]
pub struct FollowOptions {
    pub interval: Duration,
    pub verbose: bool,
}

pub struct JobsService<'a> {
    client: &'a ApiClient,
}

impl<'a> JobsService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        JobsService { client }
    }

    /// Submit a job; the console starts executing it asynchronously.
    pub fn start_job(&self, request: &JobRequest) -> Result<String, ApiError> {
        let started: JobStarted = self.client.post_json("/api/jobs", request)?;
        Ok(started.job_guid)
    }

    pub fn job_status(&self, job_guid: &str) -> Result<JobExecution, ApiError> {
        self.client.get_json(&format!("/api/jobs/{job_guid}"))
    }

    /// Best-effort remote cancel, used when the local wait is interrupted.
    pub fn cancel_job(&self, job_guid: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/api/jobs/{job_guid}"))
    }

    fn log_page(&self, job_guid: &str, start: usize) -> Result<LogPage, ApiError> {
        self.client
            .get_json(&format!("/api/jobs/{job_guid}/log?startOffset={start}"))
    }

    /// Poll a submitted job until it reaches a terminal state.
    ///
    /// Step changes are logged as they are observed; with `verbose`, new job
    /// log lines are streamed between polls. Interruption attempts one remote
    /// cancel and reports `Aborted`.
    pub fn follow_job(
        &self,
        job_guid: &str,
        options: &FollowOptions,
        cancel: &CancelToken,
    ) -> Result<PollOutcome<JobExecution>, ApiError> {
        let poller = JobPoller::new(options.interval, cancel.clone());
        let mut log_offset = 0usize;
        poller.wait(
            || {
                let status = self.job_status(job_guid)?;
                if options.verbose {
                    log_offset = self.stream_log(job_guid, log_offset);
                }
                Ok(status)
            },
            |job| job.state,
            |job| job.current_step.clone(),
            |old, new| match old {
                Some(old) => info!("job step changed: {old} -> {new}"),
                None => info!("job step: {new}"),
            },
            || {
                info!("interrupt received, cancelling job {job_guid} on the console");
                if let Err(err) = self.cancel_job(job_guid) {
                    warn!("could not cancel job {job_guid}, cancel it manually: {err}");
                }
            },
        )
    }

    /// Print any new log lines; failures only degrade verbosity.
    fn stream_log(&self, job_guid: &str, offset: usize) -> usize {
        match self.log_page(job_guid, offset) {
            Ok(page) => {
                for line in &page.lines {
                    info!("{}", line.content);
                }
                offset + page.lines.len()
            }
            Err(err) => {
                warn!("could not fetch job log: {err}");
                offset
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_produces_console_wire_shape() {
        let request = JobRequestBuilder::new("app-1", JobType::Analyze)
            .start_step(STEP_ACCEPT)
            .end_step(STEP_ANALYZE)
            .version_guid("v-1")
            .version_name("v1.0")
            .node_name("node-2")
            .process_imaging(true)
            .build();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["jobType"], "ANALYZE");
        assert_eq!(body["jobParameters"]["appGuid"], "app-1");
        assert_eq!(body["jobParameters"]["startStep"], "accept");
        assert_eq!(body["jobParameters"]["endStep"], "analyze");
        assert_eq!(body["jobParameters"]["versionGuid"], "v-1");
        assert_eq!(body["jobParameters"]["nodeName"], "node-2");
        assert_eq!(body["jobParameters"]["processImaging"], true);
    }

    #[test]
    fn request_builder_skips_app_guid_when_absent() {
        let request = JobRequestBuilder::new("", JobType::CreateApplication)
            .app_name("shop")
            .build();
        let body = serde_json::to_value(&request).unwrap();
        assert!(body["jobParameters"].get("appGuid").is_none());
        assert_eq!(body["jobParameters"]["appName"], "shop");
    }

    #[test]
    fn release_date_uses_console_format() {
        let date = DateTime::parse_from_rfc3339("2024-03-05T10:20:30.123Z")
            .unwrap()
            .with_timezone(&Utc);
        let request = JobRequestBuilder::new("app-1", JobType::Analyze)
            .release_and_snapshot_date(date)
            .build();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["jobParameters"]["releaseDate"], "2024-03-05T10:20:30.123Z");
        assert_eq!(
            body["jobParameters"]["snapshotDate"],
            "2024-03-05T10:20:30.123Z"
        );
    }
}
