//! One module per subcommand; each is thin orchestration over the services.
//!
//! Commands share a common shape: connect and validate, resolve remote
//! entities, submit one job, follow it to a terminal state, and map the
//! outcome onto an exit code.
use crate::api::types::{JobExecution, JobState};
use crate::api::ApiError;
use crate::cli::Command;
use crate::exit::ExitStatus;
use crate::jobs::{CancelToken, JobRequest, PollOutcome};
use tracing::{error, info};

mod analyze;
mod context;
mod deep_analyze;
mod deliver;
mod import;
mod onboard;
mod publish;
mod settings;
mod snapshot;

pub(crate) use context::CommandContext;

pub fn dispatch(command: Command, cancel: CancelToken) -> ExitStatus {
    match command {
        Command::Analyze(args) => analyze::run(args, cancel),
        Command::Deliver(args) => deliver::run(args, cancel),
        Command::Snapshot(args) => snapshot::run(args, cancel),
        Command::Onboard(args) => onboard::run(args, cancel),
        Command::DeepAnalyze(args) => deep_analyze::run(args, cancel),
        Command::PublishImaging(args) => publish::run(args, cancel),
        Command::Import(args) => import::run(args, cancel),
        Command::UpdateSettings(args) => settings::run(args, cancel),
    }
}

/// Map an unexpected error onto an exit code, logging the chain.
pub(crate) fn failure(err: anyhow::Error) -> ExitStatus {
    let status = match err.downcast_ref::<ApiError>() {
        Some(api) if api.is_auth_failure() => ExitStatus::LoginError,
        _ => ExitStatus::GeneralError,
    };
    error!("{err:#}");
    status
}

/// Submit a job and follow it; start/poll failures map to the poll-error
/// exit code at the call site.
pub(crate) fn start_and_follow(
    ctx: &CommandContext,
    request: &JobRequest,
    label: &str,
) -> Result<PollOutcome<JobExecution>, ExitStatus> {
    let jobs = ctx.jobs();
    let job_guid = match jobs.start_job(request) {
        Ok(guid) => guid,
        Err(err) => {
            let err = anyhow::Error::from(err);
            error!("could not start the {label} job: {err:#}");
            return Err(ExitStatus::JobPollError);
        }
    };
    info!("{label} job is ongoing: {job_guid}");
    match jobs.follow_job(&job_guid, &ctx.follow, &ctx.cancel) {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            let err = anyhow::Error::from(err);
            error!("error while polling the {label} job {job_guid}: {err:#}");
            Err(ExitStatus::JobPollError)
        }
    }
}

/// Translate a terminal job observation into the command's exit code.
pub(crate) fn finish_job(
    outcome: PollOutcome<JobExecution>,
    label: &str,
    success_message: &str,
) -> ExitStatus {
    match outcome {
        PollOutcome::Aborted => {
            error!("the {label} job was interrupted; the operation is aborted");
            ExitStatus::Aborted
        }
        PollOutcome::Finished(job) if job.state == JobState::Completed => {
            info!("{success_message}");
            ExitStatus::Success
        }
        PollOutcome::Finished(job) => {
            match job.failure_step.as_deref() {
                Some(step) => error!(
                    "the {label} job {} did not complete: state is '{}' on step '{step}'",
                    job.guid, job.state
                ),
                None => error!(
                    "the {label} job {} did not complete: state is '{}'",
                    job.guid, job.state
                ),
            }
            ExitStatus::JobFailed
        }
    }
}
