//! `deep-analyze`: full analysis of a fast-scanned application.
use super::{failure, finish_job, start_and_follow, CommandContext};
use crate::api::types::{JobType, ModuleGenerationType};
use crate::cli::DeepAnalyzeArgs;
use crate::exit::ExitStatus;
use crate::jobs::{CancelToken, JobRequestBuilder};
use chrono::Utc;
use tracing::{error, info};

pub(crate) fn run(args: DeepAnalyzeArgs, cancel: CancelToken) -> ExitStatus {
    let ctx = match CommandContext::connect(&args.shared, cancel) {
        Ok(ctx) => ctx,
        Err(status) => return status,
    };
    match execute(&ctx, &args) {
        Ok(status) => status,
        Err(err) => failure(err),
    }
}

fn execute(ctx: &CommandContext, args: &DeepAnalyzeArgs) -> anyhow::Result<ExitStatus> {
    let apps = ctx.apps();

    info!("searching for application '{}' on the console", args.app_name);
    let Some(app) = apps.application_by_name(&args.app_name)? else {
        error!(
            "cannot deep-analyze '{}': run a fast scan (onboard) first",
            args.app_name
        );
        return Ok(ExitStatus::FastScanRequired);
    };
    let onboarding = apps.onboarding_info(&app.guid)?;

    let mut snapshot_name = args.snapshot_name.clone();
    if args.publish_to_engineering && snapshot_name.as_deref().unwrap_or_default().is_empty() {
        let defaulted = format!("Snapshot-{}", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3f"));
        info!("defaulting the snapshot name to {defaulted}");
        snapshot_name = Some(defaulted);
    }

    let mut builder = JobRequestBuilder::new(&app.guid, JobType::DeepAnalysis)
        .process_imaging(args.process_imaging)
        .publish_to_engineering(args.publish_to_engineering)
        .upload_application(args.publish_to_engineering);
    if let Some(name) = snapshot_name.as_deref() {
        builder = builder.snapshot_name(name);
    }
    // Both "preserve" and "full content" mean: leave the parameter unset and
    // let the console keep its configuration.
    if let Some(generation) = args.module_generation_type {
        if !matches!(
            generation,
            ModuleGenerationType::PreserveConfigured | ModuleGenerationType::FullContent
        ) {
            builder = builder.module_generation_type(generation);
        }
    }
    if let Some(caip) = onboarding.caip_version.as_deref() {
        builder = builder.caip_version(caip);
    }
    if let Some(node) = onboarding.target_node.as_deref() {
        builder = builder.node_name(node);
    }

    info!("triggering deep analysis for '{}'", args.app_name);
    let outcome = match start_and_follow(ctx, &builder.build(), "deep analysis") {
        Ok(outcome) => outcome,
        Err(status) => return Ok(status),
    };
    Ok(finish_job(
        outcome,
        "deep analysis",
        "deep analysis done successfully",
    ))
}
