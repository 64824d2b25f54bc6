//! `publish-imaging`: push existing analysis data to the imaging viewer.
use super::{failure, finish_job, start_and_follow, CommandContext};
use crate::api::types::{JobType, VersionStatus};
use crate::cli::PublishImagingArgs;
use crate::exit::ExitStatus;
use crate::jobs::{CancelToken, JobRequestBuilder};
use tracing::{error, info};

pub(crate) fn run(args: PublishImagingArgs, cancel: CancelToken) -> ExitStatus {
    let ctx = match CommandContext::connect(&args.shared, cancel) {
        Ok(ctx) => ctx,
        Err(status) => return status,
    };
    match execute(&ctx, &args) {
        Ok(status) => status,
        Err(err) => failure(err),
    }
}

fn execute(ctx: &CommandContext, args: &PublishImagingArgs) -> anyhow::Result<ExitStatus> {
    let apps = ctx.apps();

    info!("searching for application '{}' on the console", args.app_name);
    let Some(app) = apps.application_by_name(&args.app_name)? else {
        error!("no action to perform: application '{}' does not exist", args.app_name);
        return Ok(ExitStatus::ApplicationNotFound);
    };

    if !apps.is_onboarding_enabled()? {
        error!("the onboarding mode is OFF on the console; switch it ON before publishing");
        return Ok(ExitStatus::OnboardingDisabled);
    }

    let versions = apps.versions(&app.guid)?;
    if versions.is_empty() {
        error!("no version for '{}'; deliver and analyze one first", args.app_name);
        return Ok(ExitStatus::NoVersion);
    }

    let details = apps.application_details(&app.guid)?;
    let Some(current) = details.version.as_ref() else {
        error!("application '{}' reports no current version", args.app_name);
        return Ok(ExitStatus::NoVersion);
    };
    if current.status < VersionStatus::Analyzed {
        error!(
            "version status '{:?}' does not allow publishing to imaging",
            current.status
        );
        return Ok(ExitStatus::VersionStatusInvalid);
    }

    // Onboarded applications publish through a rescan with imaging enabled;
    // legacy ones still have a dedicated job type.
    let builder = if details.onboarded {
        info!("publishing through the fast-scan workflow");
        let mut builder =
            JobRequestBuilder::new(&details.guid, JobType::DeepAnalysis).process_imaging(true);
        if let Some(node) = details.target_node.as_deref() {
            builder = builder.node_name(node);
        }
        if let Some(caip) = details.caip_version.as_deref() {
            builder = builder.caip_version(caip);
        }
        builder
    } else {
        JobRequestBuilder::new(&details.guid, JobType::PublishImaging)
    };

    let outcome = match start_and_follow(ctx, &builder.build(), "publish to imaging") {
        Ok(outcome) => outcome,
        Err(status) => return Ok(status),
    };
    Ok(finish_job(
        outcome,
        "publish to imaging",
        "publish to imaging done successfully",
    ))
}
