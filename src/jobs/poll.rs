//! Generic polling for long-running remote work.
//!
//! Every command funnels its wait through one of two loops: `JobPoller` for
//! jobs with a state machine and workflow steps, and `PendingPoller` for
//! 202/pending-result sub-operations. Both take their collaborators as
//! closures so the loops stay independent of HTTP and testable with scripted
//! observations.
use crate::api::types::JobState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once, OnceLock};
use std::thread;
use std::time::Duration;

static SIGINT_TARGET: OnceLock<Arc<AtomicBool>> = OnceLock::new();
static SIGINT_HOOK: Once = Once::new();

extern "C" fn on_sigint(_signum: libc::c_int) {
    // Only an atomic store; anything heavier is unsafe in a signal handler.
    if let Some(flag) = SIGINT_TARGET.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Cooperative cancellation flag checked between poll iterations.
///
/// The signal handler only flips the atomic; the poll loop observes it on
/// its next iteration and performs the single best-effort remote cancel
/// itself.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Trip this token when the process receives SIGINT.
    pub fn trip_on_sigint(&self) {
        let _ = SIGINT_TARGET.set(self.flag.clone());
        SIGINT_HOOK.call_once(|| unsafe {
            libc::signal(libc::SIGINT, on_sigint as libc::sighandler_t);
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Outcome of waiting on a remote job.
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// The job reached a terminal state; the final observation is attached.
    Finished(T),
    /// The wait was interrupted locally after one cancel attempt.
    Aborted,
}

/// Fixed-interval poller driving the job state machine to a terminal state.
///
/// There is deliberately no iteration cap and no backoff: the wait is bounded
/// only by the transport timeout or by the cancel token.
pub struct JobPoller {
    interval: Duration,
    cancel: CancelToken,
}

impl JobPoller {
    pub fn new(interval: Duration, cancel: CancelToken) -> Self {
        JobPoller { interval, cancel }
    }

    /// Poll `fetch` until the extracted state is terminal.
    ///
    /// `on_step` fires once per observed step change, in observation order,
    /// with the previous step (if any) and the new one. `on_cancel` fires at
    /// most once, when the token trips mid-wait.
    pub fn wait<T, E>(
        &self,
        fetch: impl FnMut() -> Result<T, E>,
        state_of: impl Fn(&T) -> JobState,
        step_of: impl Fn(&T) -> Option<String>,
        on_step: impl FnMut(Option<&str>, &str),
        on_cancel: impl FnMut(),
    ) -> Result<PollOutcome<T>, E> {
        self.wait_with_sleep(fetch, state_of, step_of, on_step, on_cancel, thread::sleep)
    }

    pub(crate) fn wait_with_sleep<T, E>(
        &self,
        mut fetch: impl FnMut() -> Result<T, E>,
        state_of: impl Fn(&T) -> JobState,
        step_of: impl Fn(&T) -> Option<String>,
        mut on_step: impl FnMut(Option<&str>, &str),
        mut on_cancel: impl FnMut(),
        mut sleep: impl FnMut(Duration),
    ) -> Result<PollOutcome<T>, E> {
        let mut last_step: Option<String> = None;
        loop {
            if self.cancel.is_cancelled() {
                on_cancel();
                return Ok(PollOutcome::Aborted);
            }
            let observation = fetch()?;
            if let Some(step) = step_of(&observation) {
                if last_step.as_deref() != Some(step.as_str()) {
                    on_step(last_step.as_deref(), &step);
                    last_step = Some(step);
                }
            }
            if state_of(&observation).is_terminal() {
                return Ok(PollOutcome::Finished(observation));
            }
            sleep(self.interval);
        }
    }
}

/// Bounded poller for 202 pending results.
///
/// The original console clients loop on the pending endpoint forever; here
/// the bound is explicit so a stuck server-side computation surfaces as an
/// error instead of a hung process.
pub struct PendingPoller {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PendingPoller {
    fn default() -> Self {
        PendingPoller {
            interval: Duration::from_secs(3),
            max_attempts: 200,
        }
    }
}

impl PendingPoller {
    /// Poll `fetch` until it yields a body.
    ///
    /// `fetch` returns `Ok(None)` while the server still answers 202; any
    /// other status must surface as `Err` and aborts the wait immediately.
    pub fn wait<T, E>(
        &self,
        fetch: impl FnMut() -> Result<Option<T>, E>,
        on_exhausted: impl FnOnce() -> E,
    ) -> Result<T, E> {
        self.wait_with_sleep(fetch, on_exhausted, thread::sleep)
    }

    pub(crate) fn wait_with_sleep<T, E>(
        &self,
        mut fetch: impl FnMut() -> Result<Option<T>, E>,
        on_exhausted: impl FnOnce() -> E,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T, E> {
        for attempt in 0..self.max_attempts {
            if let Some(body) = fetch()? {
                return Ok(body);
            }
            if attempt + 1 < self.max_attempts {
                sleep(self.interval);
            }
        }
        Err(on_exhausted())
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
