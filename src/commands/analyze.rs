//! `analyze`: run an analysis on an already delivered version.
use super::{failure, finish_job, start_and_follow, CommandContext};
use crate::api::types::{DebugOptions, JobType, ModuleGenerationType, VersionStatus};
use crate::apps::{select, ApplicationService};
use crate::cli::AnalyzeArgs;
use crate::exit::ExitStatus;
use crate::jobs::{
    CancelToken, JobRequestBuilder, STEP_ACCEPT, STEP_ANALYZE, STEP_SNAPSHOT_INDICATOR,
    STEP_UPLOAD_SNAPSHOT,
};
use chrono::Utc;
use tracing::{error, info};

pub(crate) fn run(args: AnalyzeArgs, cancel: CancelToken) -> ExitStatus {
    let ctx = match CommandContext::connect(&args.shared, cancel) {
        Ok(ctx) => ctx,
        Err(status) => return status,
    };
    match execute(&ctx, &args) {
        Ok(status) => status,
        Err(err) => failure(err),
    }
}

fn execute(ctx: &CommandContext, args: &AnalyzeArgs) -> anyhow::Result<ExitStatus> {
    let apps = ctx.apps();

    info!("searching for application '{}' on the console", args.app_name);
    let Some(app) = apps.application_by_name(&args.app_name)? else {
        error!("application '{}' was not found on the console", args.app_name);
        return Ok(ExitStatus::ApplicationNotFound);
    };
    let details = apps.application_details(&app.guid)?;

    let versions = apps.versions(&app.guid)?;
    if versions.is_empty() {
        error!("no version exists for '{}'; deliver one first", args.app_name);
        return Ok(ExitStatus::NoVersion);
    }
    let Some(version) = select::select_version(
        &versions,
        args.version_name.as_deref(),
        VersionStatus::Delivered,
    ) else {
        match args.version_name.as_deref() {
            Some(name) => error!("no version named '{name}' on '{}'", args.app_name),
            None => error!(
                "no delivered version to analyze on '{}'; deliver one first",
                args.app_name
            ),
        }
        return Ok(ExitStatus::VersionNotFound);
    };

    // A version still in Delivered state must be accepted first; anything
    // further along can go straight to analysis.
    let start_step = if version.status == VersionStatus::Delivered {
        STEP_ACCEPT
    } else {
        STEP_ANALYZE
    };
    let mut builder = JobRequestBuilder::new(&app.guid, JobType::Analyze)
        .start_step(start_step)
        .version_guid(&version.guid)
        .version_name(&version.name)
        .release_and_snapshot_date(Utc::now());
    if let Some(node) = details.target_node.as_deref() {
        builder = builder.node_name(node);
    }
    if let Some(caip) = details.caip_version.as_deref() {
        builder = builder.caip_version(caip);
    }

    if args.with_snapshot {
        let consolidate = args.process_imaging || !args.no_consolidation;
        let snapshot_name = format!("Snapshot-{}", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3f"));
        builder = builder
            .snapshot_name(&snapshot_name)
            .process_imaging(args.process_imaging)
            .upload_application(consolidate)
            .end_step(if consolidate {
                STEP_UPLOAD_SNAPSHOT
            } else {
                STEP_SNAPSHOT_INDICATOR
            });
        if !consolidate {
            info!(
                "snapshot {snapshot_name} for '{}' will be taken but not published",
                args.app_name
            );
        }
    } else {
        builder = builder.end_step(STEP_ANALYZE);
    }

    if let Some(generation) = args.module_generation_type {
        // FULL_CONTENT is a module option, not a job parameter.
        if generation == ModuleGenerationType::FullContent {
            apps.set_module_generation(&app.guid, generation);
        } else {
            builder = builder.module_generation_type(generation);
        }
    }

    // Debug options are console-side state: apply the requested toggles for
    // the duration of the job and restore the previous values afterwards.
    // These updates are best-effort and never fail the command.
    let saved_options = (args.show_sql || args.amt_profile).then(|| apps.debug_options(&app.guid));
    if args.show_sql {
        apps.update_show_sql(&app.guid, true);
    }
    if args.amt_profile {
        apps.update_amt_profile(&app.guid, true);
    }

    info!(
        "running analysis on '{}' version '{}'",
        args.app_name, version.name
    );
    let outcome = match start_and_follow(ctx, &builder.build(), "analysis") {
        Ok(outcome) => outcome,
        Err(status) => {
            restore_debug_options(&apps, &app.guid, saved_options.as_ref());
            return Ok(status);
        }
    };
    restore_debug_options(&apps, &app.guid, saved_options.as_ref());
    Ok(finish_job(outcome, "analysis", "analysis completed successfully"))
}

fn restore_debug_options(
    apps: &ApplicationService<'_>,
    app_guid: &str,
    saved: Option<&DebugOptions>,
) {
    if let Some(options) = saved {
        apps.update_show_sql(app_guid, options.show_sql);
        apps.update_amt_profile(app_guid, options.activate_amt_memory_profile);
    }
}
