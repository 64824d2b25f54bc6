//! Application-level operations: lookup, versions, onboarding settings,
//! delivery configurations, and package discovery.
//!
//! Everything here is a thin layer over the REST client; the console owns all
//! state and this service only reads snapshots or submits one-shot writes.
use crate::api::types::{
    Application, Applications, DebugOptions, DeliveryConfiguration, DeliveryPackage, EntityRef,
    Envelope, ExclusionRule, ImagingSettings, ImportableApplication, JobState, JobType,
    ModuleGenerationType, OnboardingInfo, Version, VersionStatus,
};
use crate::api::{ApiClient, ApiError, PostOutcome};
use crate::jobs::{
    CancelToken, FollowOptions, JobRequestBuilder, JobsService, PendingPoller, PollOutcome,
};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{info, warn};

pub mod select;

/// Exclusion input gathered from the command line.
#[derive(Debug, Default, Clone)]
pub struct Exclusions {
    /// Comma-separated glob patterns; empty means "use the console defaults".
    pub patterns: Vec<String>,
    /// Project exclusion rules forwarded verbatim.
    pub rules: Vec<String>,
}

/// Ignore patterns applied when the user supplies none.
pub fn default_ignore_patterns() -> BTreeSet<String> {
    [
        "**/.git/**",
        "**/.svn/**",
        "**/node_modules/**",
        "**/target/**",
        "**/tmp/**",
        "**/*.log",
    ]
    .iter()
    .map(|pattern| pattern.to_string())
    .collect()
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("discovered packages have no resolvable path: {}", .0.join(", "))]
    InvalidPackagePaths(Vec<String>),
    #[error("timed out waiting for package discovery results")]
    DiscoveryTimedOut,
}

/// How an application name resolved, possibly after a creation job.
#[derive(Debug)]
pub enum AppResolution {
    Found(Application),
    Created(String),
    /// Not on the console, and creating it was not allowed.
    Missing,
    /// The creation job ran but did not produce an application.
    CreationFailed,
    Aborted,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscoverPackagesRequest<'a> {
    source_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_version_guid: Option<&'a str>,
}

#[derive(Serialize)]
struct FileCommandRequest<'a> {
    command: &'a str,
    path: String,
}

pub struct ApplicationService<'a> {
    client: &'a ApiClient,
}

impl<'a> ApplicationService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        ApplicationService { client }
    }

    pub fn applications(&self) -> Result<Vec<Application>, ApiError> {
        let listing: Applications = self.client.get_json("/api/applications")?;
        Ok(listing.applications)
    }

    /// Case-insensitive exact match against the remote application list.
    pub fn application_by_name(&self, name: &str) -> Result<Option<Application>, ApiError> {
        Ok(self
            .applications()?
            .into_iter()
            .find(|app| app.name.eq_ignore_ascii_case(name)))
    }

    pub fn application_details(&self, app_guid: &str) -> Result<Application, ApiError> {
        self.client.get_json(&format!("/api/applications/{app_guid}"))
    }

    pub fn versions(&self, app_guid: &str) -> Result<Vec<Version>, ApiError> {
        self.client
            .get_json(&format!("/api/applications/{app_guid}/versions"))
    }

    pub fn onboarding_info(&self, app_guid: &str) -> Result<OnboardingInfo, ApiError> {
        self.client
            .get_json(&format!("/api/applications/{app_guid}/onboarding"))
    }

    pub fn is_onboarding_enabled(&self) -> Result<bool, ApiError> {
        let answer: Envelope<bool> = self.client.get_json("/api/settings/onboarding")?;
        Ok(answer.data)
    }

    pub fn set_onboarding_enabled(&self, enabled: bool) -> Result<(), ApiError> {
        self.client
            .put_json("/api/settings/onboarding", &Envelope::of(enabled))
    }

    pub fn is_imaging_available(&self) -> Result<bool, ApiError> {
        let settings: ImagingSettings = self.client.get_json("/api/settings/imaging")?;
        Ok(settings.valid)
    }

    /// Current debug options; an unreachable endpoint degrades to defaults.
    pub fn debug_options(&self, app_guid: &str) -> DebugOptions {
        match self
            .client
            .get_json(&format!("/api/applications/{app_guid}/debug-options"))
        {
            Ok(options) => options,
            Err(err) => {
                warn!("could not read debug options: {err}");
                DebugOptions::default()
            }
        }
    }

    /// Best-effort toggle; failure is logged at warn level and never retried.
    pub fn update_show_sql(&self, app_guid: &str, show_sql: bool) {
        let path = format!("/api/applications/{app_guid}/debug-options/show-sql");
        if let Err(err) = self.client.put_json(&path, &Envelope::of(show_sql)) {
            warn!("could not update show-sql debug option: {err}");
        }
    }

    /// Best-effort toggle; failure is logged at warn level and never retried.
    pub fn update_amt_profile(&self, app_guid: &str, amt_profile: bool) {
        let path = format!("/api/applications/{app_guid}/debug-options/amt-profile");
        if let Err(err) = self.client.put_json(&path, &Envelope::of(amt_profile)) {
            warn!("could not update amt-profile debug option: {err}");
        }
    }

    /// Best-effort module option update used for full-content generation.
    pub fn set_module_generation(&self, app_guid: &str, generation: ModuleGenerationType) {
        let path = format!("/api/applications/{app_guid}/module-options/generation-type");
        match self.client.put_json(&path, &Envelope::of(generation.as_str())) {
            Ok(()) => info!("module generation type set to {}", generation.as_str()),
            Err(err) => warn!("could not update module generation type: {err}"),
        }
    }

    /// Check whether a folder exists on the console's source drop area.
    pub fn server_folder_exists(&self, path_to_check: &str) -> bool {
        let request = FileCommandRequest {
            command: "LS",
            path: format!("SOURCES:{path_to_check}"),
        };
        self.client.post_unit("/api/server-folders", &request).is_ok()
    }

    /// Update one computation setting on an analyzed application.
    pub fn update_computation_setting(
        &self,
        app_guid: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/api/applications/{app_guid}/computation-settings/{key}");
        self.client.put_json(&path, &Envelope::of(value))
    }

    /// Applications other nodes offer for import into this console.
    pub fn importable_applications(&self) -> Result<Vec<ImportableApplication>, ApiError> {
        self.client.get_json("/api/import-applications")
    }

    /// Discover delivery packages for a source drop, following the 202
    /// pending-result flow when the console defers the computation.
    pub fn discover_packages(
        &self,
        app_guid: &str,
        source_path: &str,
        previous_version_guid: Option<&str>,
    ) -> Result<Vec<DeliveryPackage>, DeliveryError> {
        let request = DiscoverPackagesRequest {
            source_path,
            previous_version_guid,
        };
        let path = format!("/api/applications/{app_guid}/delivery-configuration/discover-packages");
        match self.client.post_accepting_pending(&path, &request)? {
            PostOutcome::Done(packages) => Ok(packages),
            PostOutcome::Pending(pending) => {
                info!("package discovery deferred, polling pending result {}", pending.guid);
                let result_path =
                    format!("/api/applications/{app_guid}/pending-results/{}", pending.guid);
                PendingPoller::default().wait(
                    || self.client.get_json_if_ready(&result_path).map_err(DeliveryError::Api),
                    || DeliveryError::DiscoveryTimedOut,
                )
            }
        }
    }

    /// Discover packages and register the delivery configuration, returning
    /// the GUID later job requests reference.
    pub fn prepare_delivery_configuration(
        &self,
        app: &Application,
        source_path: &str,
        exclusions: &Exclusions,
        enforce_package_paths: bool,
    ) -> Result<String, DeliveryError> {
        let previous = select::latest_version_with_status(
            &self.versions(&app.guid)?,
            VersionStatus::Delivered,
        )
        .map(|version| version.guid.clone());

        let packages = self.discover_packages(&app.guid, source_path, previous.as_deref())?;
        if enforce_package_paths || !app.in_place_mode {
            let missing: Vec<String> = packages
                .iter()
                .filter(|package| package.path.is_none())
                .map(|package| package.name.clone())
                .collect();
            if !missing.is_empty() {
                return Err(DeliveryError::InvalidPackagePaths(missing));
            }
        }

        let ignore_patterns = if exclusions.patterns.is_empty() {
            default_ignore_patterns()
        } else {
            exclusions.patterns.iter().cloned().collect()
        };
        let configuration = DeliveryConfiguration {
            ignore_patterns,
            exclusion_rules: exclusions
                .rules
                .iter()
                .map(|rule| ExclusionRule { rule: rule.clone() })
                .collect(),
            packages,
        };
        info!(
            "exclusion patterns: {}",
            configuration
                .ignore_patterns
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );

        let created: EntityRef = self.client.post_json(
            &format!("/api/applications/{}/delivery-configuration", app.guid),
            &configuration,
        )?;
        Ok(created.guid)
    }

    /// Look an application up by name, creating it through a
    /// `CreateApplication` job when allowed.
    pub fn resolve_or_create(
        &self,
        name: &str,
        auto_create: bool,
        node_name: Option<&str>,
        domain_name: Option<&str>,
        follow: &FollowOptions,
        cancel: &CancelToken,
    ) -> Result<AppResolution, ApiError> {
        if let Some(app) = self.application_by_name(name)? {
            return Ok(AppResolution::Found(app));
        }
        if !auto_create {
            return Ok(AppResolution::Missing);
        }

        info!("application '{name}' not found and auto-create enabled, creating it");
        let mut builder = JobRequestBuilder::new("", JobType::CreateApplication).app_name(name);
        if let Some(node) = node_name {
            builder = builder.node_name(node);
        }
        if let Some(domain) = domain_name {
            builder = builder.domain_name(domain);
        }

        let jobs = JobsService::new(self.client);
        let job_guid = jobs.start_job(&builder.build())?;
        info!("application creation job is ongoing: {job_guid}");
        match jobs.follow_job(&job_guid, follow, cancel)? {
            PollOutcome::Aborted => Ok(AppResolution::Aborted),
            PollOutcome::Finished(job) => match job.parameter("appGuid") {
                Some(guid) if job.state == JobState::Completed => {
                    Ok(AppResolution::Created(guid.to_string()))
                }
                _ => {
                    warn!(
                        "application creation job {job_guid} ended in state '{}'",
                        job.state
                    );
                    Ok(AppResolution::CreationFailed)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ignore_patterns_cover_vcs_and_build_noise() {
        let patterns = default_ignore_patterns();
        assert!(patterns.contains("**/.git/**"));
        assert!(patterns.contains("**/node_modules/**"));
    }

    #[test]
    fn discover_request_omits_absent_previous_version() {
        let request = DiscoverPackagesRequest {
            source_path: "upload:shop.zip",
            previous_version_guid: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["sourcePath"], "upload:shop.zip");
        assert!(body.get("previousVersionGuid").is_none());
    }
}
