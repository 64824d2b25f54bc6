//! `deliver`: upload sources and register them as a new version.
use super::{failure, finish_job, start_and_follow, CommandContext};
use crate::api::types::JobType;
use crate::apps::{AppResolution, Exclusions};
use crate::cli::DeliverArgs;
use crate::exit::ExitStatus;
use crate::jobs::{CancelToken, JobRequestBuilder};
use chrono::Utc;
use tracing::{error, info};

pub(crate) fn run(args: DeliverArgs, cancel: CancelToken) -> ExitStatus {
    let ctx = match CommandContext::connect(&args.shared, cancel) {
        Ok(ctx) => ctx,
        Err(status) => return status,
    };
    match execute(&ctx, &args) {
        Ok(status) => status,
        Err(err) => failure(err),
    }
}

fn execute(ctx: &CommandContext, args: &DeliverArgs) -> anyhow::Result<ExitStatus> {
    let apps = ctx.apps();

    info!("searching for application '{}' on the console", args.app_name);
    let app_guid = match apps.resolve_or_create(
        &args.app_name,
        args.auto_create,
        args.node_name.as_deref(),
        args.domain_name.as_deref(),
        &ctx.follow,
        &ctx.cancel,
    )? {
        AppResolution::Found(app) => app.guid,
        AppResolution::Created(guid) => {
            info!("application '{}' created: {guid}", args.app_name);
            guid
        }
        AppResolution::Missing => {
            error!(
                "application '{}' was not found and auto-create is disabled",
                args.app_name
            );
            return Ok(ExitStatus::ApplicationNotFound);
        }
        AppResolution::CreationFailed => {
            error!("could not create application '{}'", args.app_name);
            return Ok(ExitStatus::JobFailed);
        }
        AppResolution::Aborted => {
            error!("application creation was interrupted; the delivery is aborted");
            return Ok(ExitStatus::Aborted);
        }
    };
    let app = apps.application_details(&app_guid)?;

    let uploads = ctx.uploads();
    let source_path = match uploads.deliver_sources(&args.file, Some(&app.guid), |folder| {
        apps.server_folder_exists(folder)
    }) {
        Ok(path) => path,
        Err(err) => {
            let err = anyhow::Error::from(err);
            error!("could not deliver the source archive: {err:#}");
            return Ok(ExitStatus::UploadError);
        }
    };
    info!("sources available as {source_path}");

    let exclusions = Exclusions {
        patterns: args.exclusion_patterns.clone(),
        rules: args.exclusion_rules.clone(),
    };
    info!("preparing the delivery configuration");
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
    info!("delivery configuration created: {delivery_config_guid}");

    // Clone the previous delivery unless this is the first version or the
    // caller asked for a fresh configuration.
    let has_previous = !apps.versions(&app.guid)?.is_empty();
    let job_type = if has_previous && !args.no_clone {
        JobType::CloneVersion
    } else {
        JobType::AddVersion
    };
    let version_name = match args.version_name.clone() {
        Some(name) => name,
        None => format!("v{}", Utc::now().format("%Y%m%d.%H%M%S")),
    };

    let mut builder = JobRequestBuilder::new(&app.guid, job_type)
        .version_name(&version_name)
        .source_path(&source_path)
        .delivery_config_guid(&delivery_config_guid)
        .release_and_snapshot_date(Utc::now());
    if let Some(node) = app.target_node.as_deref() {
        builder = builder.node_name(node);
    }
    if let Some(caip) = app.caip_version.as_deref() {
        builder = builder.caip_version(caip);
    }

    info!(
        "delivering version '{version_name}' to '{}' ({})",
        args.app_name,
        match job_type {
            JobType::CloneVersion => "cloning the previous version",
            _ => "new delivery configuration",
        }
    );
    let outcome = match start_and_follow(ctx, &builder.build(), "delivery") {
        Ok(outcome) => outcome,
        Err(status) => return Ok(status),
    };
    Ok(finish_job(outcome, "delivery", "version delivered successfully"))
}
