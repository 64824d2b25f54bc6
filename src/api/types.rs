//! Wire types for the console REST API.
//!
//! All of these are read-only snapshots fetched per call; the client never
//! caches them across requests. Field names follow the console's camelCase
//! JSON convention.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Envelope used by the applications listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct Applications {
    #[serde(default)]
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub caip_version: Option<String>,
    #[serde(default)]
    pub target_node: Option<String>,
    #[serde(default)]
    pub onboarded: bool,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub in_place_mode: bool,
    #[serde(default)]
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub guid: String,
    pub name: String,
    pub status: VersionStatus,
    pub version_date: DateTime<Utc>,
}

/// Lifecycle states of a delivered version.
///
/// The declaration order is the total order used by "latest qualifying
/// version" selection; keep it sorted from least to most advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    Opened,
    Delivering,
    Delivered,
    Accepted,
    AnalysisDone,
    Analyzed,
    ImagingProcessed,
    SnapshotDone,
    FullyAnalyzed,
}

/// Remote job lifecycle. Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    /// Forward compatibility with console releases that add states.
    #[serde(other)]
    Unknown,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
            JobState::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Analyze,
    AddVersion,
    CloneVersion,
    CreateApplication,
    FastScan,
    DeepAnalysis,
    PublishImaging,
    ImportApplications,
}

/// How the console derives modules for an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleGenerationType {
    FullContent,
    OnePerAu,
    OnePerTechno,
    PreserveConfigured,
}

impl ModuleGenerationType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleGenerationType::FullContent => "FULL_CONTENT",
            ModuleGenerationType::OnePerAu => "ONE_PER_AU",
            ModuleGenerationType::OnePerTechno => "ONE_PER_TECHNO",
            ModuleGenerationType::PreserveConfigured => "PRESERVE_CONFIGURED",
        }
    }

    /// Parser used for the CLI flag form (`full-content`, `one-per-au`, …).
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.to_ascii_lowercase().as_str() {
            "full-content" | "full_content" => Ok(ModuleGenerationType::FullContent),
            "one-per-au" | "one_per_au" => Ok(ModuleGenerationType::OnePerAu),
            "one-per-techno" | "one_per_techno" => Ok(ModuleGenerationType::OnePerTechno),
            "preserve-configured" | "preserve_configured" => {
                Ok(ModuleGenerationType::PreserveConfigured)
            }
            other => Err(format!(
                "unknown module generation type {other:?} (expected full-content, \
                 one-per-au, one-per-techno or preserve-configured)"
            )),
        }
    }
}

/// One observation of a remote job, as returned by the status endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExecution {
    pub guid: String,
    pub state: JobState,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub failure_step: Option<String>,
    #[serde(default)]
    pub job_parameters: BTreeMap<String, serde_json::Value>,
}

impl JobExecution {
    /// Read a string job parameter, e.g. the created application GUID.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.job_parameters.get(key).and_then(|value| value.as_str())
    }
}

/// Response to a successful job submission.
#[derive(Debug, Deserialize)]
pub struct JobStarted {
    #[serde(rename = "jobGuid", alias = "guid")]
    pub job_guid: String,
}

/// GUID handle carried by a 202 response while the server keeps computing.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingResult {
    pub guid: String,
}

/// Generic created-entity response carrying only a GUID.
#[derive(Debug, Deserialize)]
pub struct EntityRef {
    pub guid: String,
}

/// Request payload describing one version delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryConfiguration {
    pub ignore_patterns: BTreeSet<String>,
    pub exclusion_rules: Vec<ExclusionRule>,
    pub packages: Vec<DeliveryPackage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExclusionRule {
    pub rule: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPackage {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// Console identity and feature flags, served at the API root.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInfo {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub enable_package_path_check: bool,
}

impl ApiInfo {
    /// Compare the advertised version against a `major.minor` floor.
    ///
    /// Unparseable or missing versions count as current, so new consoles
    /// with exotic version strings are not degraded to legacy behavior.
    pub fn version_at_least(&self, major: u32, minor: u32) -> bool {
        let Some(raw) = self.api_version.as_deref() else {
            return true;
        };
        let mut parts = raw.split('.').map(|part| part.parse::<u32>());
        match (parts.next(), parts.next()) {
            (Some(Ok(have_major)), Some(Ok(have_minor))) => {
                (have_major, have_minor) >= (major, minor)
            }
            _ => true,
        }
    }
}

/// Onboarding details for an application (analysis node, engine version).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingInfo {
    #[serde(default)]
    pub caip_version: Option<String>,
    #[serde(default)]
    pub target_node: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugOptions {
    #[serde(default)]
    pub show_sql: bool,
    #[serde(default)]
    pub activate_amt_memory_profile: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagingSettings {
    #[serde(default)]
    pub valid: bool,
}

/// An application visible on another node, offered for import.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportableApplication {
    pub name: String,
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub schema_name: Option<String>,
}

/// Per-application result of an import run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub application_name: String,
    #[serde(default)]
    pub successful: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Offset-addressed chunk of a job's log.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    #[serde(default)]
    pub lines: Vec<LogLine>,
}

#[derive(Debug, Deserialize)]
pub struct LogLine {
    pub content: String,
}

/// Value envelope used by the settings endpoints.
#[derive(Debug, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn of(data: T) -> Self {
        Envelope { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_status_orders_from_delivery_to_snapshot() {
        assert!(VersionStatus::Delivered < VersionStatus::Analyzed);
        assert!(VersionStatus::Analyzed < VersionStatus::SnapshotDone);
        assert!(VersionStatus::Opened < VersionStatus::Delivered);
        assert!(VersionStatus::SnapshotDone < VersionStatus::FullyAnalyzed);
    }

    #[test]
    fn job_state_terminal_set() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Unknown.is_terminal());
    }

    #[test]
    fn job_state_tolerates_unknown_wire_values() {
        let state: JobState = serde_json::from_str("\"RESTARTING\"").unwrap();
        assert_eq!(state, JobState::Unknown);
    }

    #[test]
    fn job_execution_decodes_console_shape() {
        let body = r#"{
            "guid": "job-1",
            "state": "RUNNING",
            "currentStep": "analyze",
            "appName": "shop",
            "jobParameters": {"appGuid": "app-9"}
        }"#;
        let job: JobExecution = serde_json::from_str(body).unwrap();
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.current_step.as_deref(), Some("analyze"));
        assert_eq!(job.parameter("appGuid"), Some("app-9"));
        assert_eq!(job.parameter("missing"), None);
    }

    #[test]
    fn api_info_version_floor() {
        let old = ApiInfo {
            api_version: Some("1.15.2".into()),
            ..ApiInfo::default()
        };
        let new = ApiInfo {
            api_version: Some("2.0.0".into()),
            ..ApiInfo::default()
        };
        let odd = ApiInfo {
            api_version: Some("latest".into()),
            ..ApiInfo::default()
        };
        assert!(!old.version_at_least(1, 16));
        assert!(new.version_at_least(1, 16));
        assert!(odd.version_at_least(1, 16));
        assert!(ApiInfo::default().version_at_least(1, 16));
    }
}
