//! `import`: pull applications managed by other nodes into this console.
use super::{failure, CommandContext};
use crate::api::types::{ImportResult, ImportableApplication};
use crate::api::{ApiError, PostOutcome};
use crate::cli::{ImportAction, ImportArgs, ImportRunArgs};
use crate::exit::ExitStatus;
use crate::jobs::{CancelToken, PendingPoller};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

pub(crate) fn run(args: ImportArgs, cancel: CancelToken) -> ExitStatus {
    let ctx = match CommandContext::connect(&args.shared, cancel) {
        Ok(ctx) => ctx,
        Err(status) => return status,
    };
    let result = match &args.action {
        ImportAction::List => list(&ctx),
        ImportAction::Run(run_args) => trigger(&ctx, run_args),
    };
    match result {
        Ok(status) => status,
        Err(err) => failure(err),
    }
}

fn list(ctx: &CommandContext) -> anyhow::Result<ExitStatus> {
    let applications: Vec<ImportableApplication> =
        ctx.apps().importable_applications()?;
    if applications.is_empty() {
        info!("no application is available for import");
        return Ok(ExitStatus::Success);
    }
    const COLUMNS: (&str, &str, &str) = ("APPLICATION", "SERVER", "SCHEMA");
    println!("{:<40} {:<24} {}", COLUMNS.0, COLUMNS.1, COLUMNS.2);
    for application in &applications {
        println!(
            "{:<40} {:<24} {}",
            application.name,
            application.server_name.as_deref().unwrap_or("-"),
            application.schema_name.as_deref().unwrap_or("-")
        );
    }
    Ok(ExitStatus::Success)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportRequest {
    application_names: Vec<String>,
    import_all: bool,
}

#[derive(Debug, Error)]
enum ImportError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("timed out waiting for the import results")]
    TimedOut,
}

fn trigger(ctx: &CommandContext, args: &ImportRunArgs) -> anyhow::Result<ExitStatus> {
    let mut names: Vec<String> = args.app_names.clone();
    names.sort();
    names.dedup();
    if names.is_empty() && !args.all {
        error!("give at least one application name, or pass --all");
        return Ok(ExitStatus::InvalidParameters);
    }

    if !args.all {
        // Refuse unknown names up front rather than half-importing the list.
        let available = ctx.apps().importable_applications()?;
        let missing: Vec<&String> = names
            .iter()
            .filter(|name| {
                !available
                    .iter()
                    .any(|app| app.name.eq_ignore_ascii_case(name))
            })
            .collect();
        if !missing.is_empty() {
            error!(
                "not available for import: {}",
                missing
                    .iter()
                    .map(|name| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            return Ok(ExitStatus::ApplicationNotFound);
        }
    }

    let request = ImportRequest {
        application_names: names,
        import_all: args.all,
    };
    info!("triggering the import");
    let results = match wait_for_import(ctx, &request) {
        Ok(results) => results,
        Err(err) => {
            error!("import did not finish: {err}");
            return Ok(ExitStatus::JobPollError);
        }
    };

    let mut failed = 0usize;
    for result in &results {
        if result.successful {
            info!("imported '{}'", result.application_name);
        } else {
            failed += 1;
            error!(
                "import of '{}' failed: {}",
                result.application_name,
                result.message.as_deref().unwrap_or("no detail")
            );
        }
    }
    if failed > 0 {
        error!("{failed} of {} imports failed", results.len());
        return Ok(ExitStatus::JobFailed);
    }
    info!("all imports completed successfully");
    Ok(ExitStatus::Success)
}

fn wait_for_import(
    ctx: &CommandContext,
    request: &ImportRequest,
) -> Result<Vec<ImportResult>, ImportError> {
    match ctx
        .client()
        .post_accepting_pending("/api/import-applications", request)?
    {
        PostOutcome::Done(results) => Ok(results),
        PostOutcome::Pending(pending) => {
            info!("import deferred, polling pending result {}", pending.guid);
            let path = format!("/api/pending-results/{}", pending.guid);
            PendingPoller::default().wait(
                || ctx.client().get_json_if_ready(&path).map_err(ImportError::Api),
                || ImportError::TimedOut,
            )
        }
    }
}
