//! `onboard`: fast-scan onboarding of a new or refreshed application.
use super::{failure, finish_job, start_and_follow, CommandContext};
use crate::api::types::{JobState, JobType};
use crate::apps::Exclusions;
use crate::cli::OnboardArgs;
use crate::exit::ExitStatus;
use crate::jobs::{CancelToken, JobRequestBuilder, PollOutcome};
use tracing::{error, info, warn};

pub(crate) fn run(args: OnboardArgs, cancel: CancelToken) -> ExitStatus {
    let ctx = match CommandContext::connect(&args.shared, cancel) {
        Ok(ctx) => ctx,
        Err(status) => return status,
    };
    match execute(&ctx, &args) {
        Ok(status) => status,
        Err(err) => failure(err),
    }
}

fn execute(ctx: &CommandContext, args: &OnboardArgs) -> anyhow::Result<ExitStatus> {
    let apps = ctx.apps();

    // The workflow needs onboarding mode; remember the previous setting and
    // put it back whatever happens below.
    let was_enabled = apps.is_onboarding_enabled()?;
    if !was_enabled {
        info!("switching the onboarding mode ON for the duration of the command");
        apps.set_onboarding_enabled(true)?;
    }
    let result = onboard(ctx, args);
    if !was_enabled {
        info!("restoring the onboarding mode to OFF");
        if let Err(err) = apps.set_onboarding_enabled(false) {
            warn!("could not restore the onboarding mode: {err}");
        }
    }
    result
}

fn onboard(ctx: &CommandContext, args: &OnboardArgs) -> anyhow::Result<ExitStatus> {
    let apps = ctx.apps();

    info!("searching for application '{}' on the console", args.app_name);
    let existing = apps.application_by_name(&args.app_name)?;
    if existing.is_none() {
        info!("application not found, starting a first onboarding");
    }

    let uploads = ctx.uploads();
    let existing_guid = existing.as_ref().map(|app| app.guid.clone());
    let source_path = match uploads.deliver_sources(&args.file, existing_guid.as_deref(), |folder| {
        apps.server_folder_exists(folder)
    }) {
        Ok(path) => path,
        Err(err) => {
            let err = anyhow::Error::from(err);
            error!("could not deliver the source archive: {err:#}");
            return Ok(ExitStatus::UploadError);
        }
    };
    info!("sources uploaded successfully: {source_path}");

    // First pass: onboard brand-new applications so the console knows the
    // name and assigns a node; refreshes skip straight to the scan.
    let app_guid = match existing_guid {
        Some(guid) => guid,
        None => {
            let mut builder = JobRequestBuilder::new("", JobType::FastScan)
                .app_name(&args.app_name)
                .source_path(&source_path);
            if let Some(domain) = args.domain_name.as_deref() {
                builder = builder.domain_name(domain);
            }
            let outcome = match start_and_follow(ctx, &builder.build(), "onboarding") {
                Ok(outcome) => outcome,
                Err(status) => return Ok(status),
            };
            match outcome {
                PollOutcome::Aborted => {
                    error!("onboarding was interrupted; the operation is aborted");
                    return Ok(ExitStatus::Aborted);
                }
                PollOutcome::Finished(job) if job.state == JobState::Completed => {
                    let Some(guid) = job.parameter("appGuid") else {
                        error!("the onboarding job did not report an application GUID");
                        return Ok(ExitStatus::GeneralError);
                    };
                    info!("application '{}' onboarded: {guid}", args.app_name);
                    guid.to_string()
                }
                PollOutcome::Finished(job) => {
                    error!("the onboarding job did not complete: state is '{}'", job.state);
                    return Ok(ExitStatus::JobFailed);
                }
            }
        }
    };

    let onboarding = apps.onboarding_info(&app_guid)?;
    let app = apps.application_details(&app_guid)?;

    info!("preparing the application delivery configuration");
    let exclusions = Exclusions {
        patterns: args.exclusion_patterns.clone(),
        rules: Vec::new(),
    };
    let delivery_config_guid = match apps.prepare_delivery_configuration(
        &app,
        &source_path,
        &exclusions,
        ctx.api_info.enable_package_path_check,
    ) {
        Ok(guid) => guid,
        Err(err) => {
            error!("could not prepare the delivery configuration: {err}");
            return Ok(ExitStatus::JobPollError);
        }
    };
    info!("delivery configuration done: {delivery_config_guid}");

    let mut builder = JobRequestBuilder::new(&app_guid, JobType::FastScan)
        .source_path(&source_path)
        .delivery_config_guid(&delivery_config_guid);
    if let Some(caip) = onboarding.caip_version.as_deref() {
        builder = builder.caip_version(caip);
    }
    if let Some(node) = onboarding.target_node.as_deref() {
        builder = builder.node_name(node);
    }
    let outcome = match start_and_follow(ctx, &builder.build(), "fast-scan") {
        Ok(outcome) => outcome,
        Err(status) => return Ok(status),
    };
    let status = finish_job(outcome, "fast-scan", "fast scan done successfully");
    if status != ExitStatus::Success {
        return Ok(status);
    }

    // Run-analysis stage, gated on imaging being configured console-side.
    if !apps.is_imaging_available()? {
        info!("run-analysis is disabled because imaging settings are missing on the console");
        return Ok(ExitStatus::RunAnalysisDisabled);
    }
    let mut builder =
        JobRequestBuilder::new(&app_guid, JobType::DeepAnalysis).process_imaging(true);
    if let Some(caip) = onboarding.caip_version.as_deref() {
        builder = builder.caip_version(caip);
    }
    if let Some(node) = onboarding.target_node.as_deref() {
        builder = builder.node_name(node);
    }
    let outcome = match start_and_follow(ctx, &builder.build(), "first analysis") {
        Ok(outcome) => outcome,
        Err(status) => return Ok(status),
    };
    Ok(finish_job(
        outcome,
        "first analysis",
        "application onboarded and analyzed successfully",
    ))
}
