//! `snapshot`: take a snapshot of an analyzed version.
use super::{failure, finish_job, start_and_follow, CommandContext};
use crate::api::types::{JobType, VersionStatus};
use crate::apps::select;
use crate::cli::SnapshotArgs;
use crate::exit::ExitStatus;
use crate::jobs::{
    CancelToken, JobRequestBuilder, STEP_CONSOLIDATE_SNAPSHOT, STEP_SNAPSHOT,
    STEP_UPLOAD_SNAPSHOT,
};
use chrono::Utc;
use tracing::{error, info};

pub(crate) fn run(args: SnapshotArgs, cancel: CancelToken) -> ExitStatus {
    let ctx = match CommandContext::connect(&args.shared, cancel) {
        Ok(ctx) => ctx,
        Err(status) => return status,
    };
    match execute(&ctx, &args) {
        Ok(status) => status,
        Err(err) => failure(err),
    }
}

fn execute(ctx: &CommandContext, args: &SnapshotArgs) -> anyhow::Result<ExitStatus> {
    let apps = ctx.apps();

    info!("searching for application '{}' on the console", args.app_name);
    let Some(app) = apps.application_by_name(&args.app_name)? else {
        error!("application '{}' was not found on the console", args.app_name);
        return Ok(ExitStatus::ApplicationNotFound);
    };

    let versions = apps.versions(&app.guid)?;
    if versions.is_empty() {
        error!("no version exists for '{}'; cannot snapshot", args.app_name);
        return Ok(ExitStatus::NoVersion);
    }
    if !versions
        .iter()
        .any(|version| version.status >= VersionStatus::AnalysisDone)
    {
        error!(
            "no analysis done for '{}'; run an analysis before snapshotting",
            args.app_name
        );
        return Ok(ExitStatus::VersionStatusInvalid);
    }
    let Some(version) = select::select_version(
        &versions,
        args.version_name.as_deref(),
        VersionStatus::AnalysisDone,
    ) else {
        match args.version_name.as_deref() {
            Some(name) => error!("no version named '{name}' on '{}'", args.app_name),
            None => error!("no analyzed version to snapshot on '{}'", args.app_name),
        }
        return Ok(ExitStatus::VersionNotFound);
    };

    let snapshot_name = match args.snapshot_name.clone() {
        Some(name) => name,
        None => Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
    };

    // Consoles older than 1.16 end the workflow on the consolidation step.
    let end_step = if ctx.api_info.version_at_least(1, 16) {
        STEP_UPLOAD_SNAPSHOT
    } else {
        STEP_CONSOLIDATE_SNAPSHOT
    };
    let builder = JobRequestBuilder::new(&app.guid, JobType::Analyze)
        .start_step(STEP_SNAPSHOT)
        .end_step(end_step)
        .version_guid(&version.guid)
        .snapshot_name(&snapshot_name)
        .release_and_snapshot_date(Utc::now());

    info!(
        "running snapshot '{snapshot_name}' on '{}' version '{}'",
        args.app_name, version.name
    );
    let outcome = match start_and_follow(ctx, &builder.build(), "snapshot") {
        Ok(outcome) => outcome,
        Err(status) => return Ok(status),
    };
    Ok(finish_job(outcome, "snapshot", "snapshot created successfully"))
}
