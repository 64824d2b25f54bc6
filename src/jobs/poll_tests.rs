use super::{CancelToken, JobPoller, PendingPoller, PollOutcome};
use crate::api::types::JobState;
use std::cell::RefCell;
use std::time::Duration;

#[derive(Clone, Debug)]
struct Observation {
    state: JobState,
    step: Option<&'static str>,
}

fn obs(state: JobState, step: Option<&'static str>) -> Observation {
    Observation { state, step }
}

/// Drive the poller through a scripted sequence of observations, recording
/// sleeps, step transitions, and cancel attempts.
struct Script {
    observations: RefCell<Vec<Observation>>,
    sleeps: RefCell<Vec<Duration>>,
    transitions: RefCell<Vec<(Option<String>, String)>>,
    cancels: RefCell<u32>,
}

impl Script {
    fn new(observations: Vec<Observation>) -> Self {
        Script {
            observations: RefCell::new(observations),
            sleeps: RefCell::new(Vec::new()),
            transitions: RefCell::new(Vec::new()),
            cancels: RefCell::new(0),
        }
    }

    fn run(&self, poller: &JobPoller) -> Result<PollOutcome<Observation>, &'static str> {
        poller.wait_with_sleep(
            || {
                if self.observations.borrow().is_empty() {
                    return Err("script exhausted");
                }
                Ok(self.observations.borrow_mut().remove(0))
            },
            |o| o.state,
            |o| o.step.map(str::to_string),
            |old, new| {
                self.transitions
                    .borrow_mut()
                    .push((old.map(str::to_string), new.to_string()));
            },
            || *self.cancels.borrow_mut() += 1,
            |d| self.sleeps.borrow_mut().push(d),
        )
    }
}

#[test]
fn terminal_on_first_check_returns_without_sleeping() {
    let script = Script::new(vec![obs(JobState::Completed, Some("done"))]);
    let poller = JobPoller::new(Duration::from_secs(10), CancelToken::new());

    let outcome = script.run(&poller).unwrap();
    match outcome {
        PollOutcome::Finished(last) => assert_eq!(last.state, JobState::Completed),
        PollOutcome::Aborted => panic!("expected finished"),
    }
    assert!(script.sleeps.borrow().is_empty());
    assert_eq!(*script.cancels.borrow(), 0);
}

#[test]
fn one_transition_per_step_change_in_order() {
    let script = Script::new(vec![
        obs(JobState::Running, Some("accept")),
        obs(JobState::Running, Some("accept")),
        obs(JobState::Running, Some("analyze")),
        obs(JobState::Running, Some("snapshot")),
        obs(JobState::Completed, Some("snapshot")),
    ]);
    let poller = JobPoller::new(Duration::from_secs(10), CancelToken::new());

    script.run(&poller).unwrap();

    let transitions = script.transitions.borrow();
    assert_eq!(
        *transitions,
        [
            (None, "accept".to_string()),
            (Some("accept".to_string()), "analyze".to_string()),
            (Some("analyze".to_string()), "snapshot".to_string()),
        ]
    );
    // One sleep between each pair of non-terminal observations.
    assert_eq!(script.sleeps.borrow().len(), 4);
}

#[test]
fn sleeps_use_configured_interval() {
    let script = Script::new(vec![
        obs(JobState::Running, None),
        obs(JobState::Failed, None),
    ]);
    let poller = JobPoller::new(Duration::from_secs(7), CancelToken::new());

    script.run(&poller).unwrap();
    assert_eq!(*script.sleeps.borrow(), [Duration::from_secs(7)]);
}

#[test]
fn fetch_error_aborts_the_wait() {
    let script = Script::new(vec![]);
    let poller = JobPoller::new(Duration::from_secs(1), CancelToken::new());

    assert_eq!(script.run(&poller).unwrap_err(), "script exhausted");
    assert_eq!(*script.cancels.borrow(), 0);
}

#[test]
fn cancelled_token_attempts_exactly_one_cancel() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let script = Script::new(vec![obs(JobState::Running, None)]);
    let poller = JobPoller::new(Duration::from_secs(1), cancel);

    let outcome = script.run(&poller).unwrap();
    assert!(matches!(outcome, PollOutcome::Aborted));
    assert_eq!(*script.cancels.borrow(), 1);
    // The scripted observation was never consumed: cancellation wins.
    assert_eq!(script.observations.borrow().len(), 1);
    assert!(script.sleeps.borrow().is_empty());
}

#[test]
fn cancel_between_iterations_marks_aborted() {
    let cancel = CancelToken::new();
    let trip = cancel.clone();
    let observations = RefCell::new(vec![
        obs(JobState::Running, None),
        obs(JobState::Running, None),
    ]);
    let cancels = RefCell::new(0u32);
    let poller = JobPoller::new(Duration::from_secs(1), cancel);

    let outcome = poller
        .wait_with_sleep(
            || Ok::<_, &'static str>(observations.borrow_mut().remove(0)),
            |o: &Observation| o.state,
            |o| o.step.map(str::to_string),
            |_, _| {},
            || *cancels.borrow_mut() += 1,
            // Interrupt arrives while the loop sleeps.
            |_| trip.cancel(),
        )
        .unwrap();

    assert!(matches!(outcome, PollOutcome::Aborted));
    assert_eq!(*cancels.borrow(), 1);
}

#[test]
fn pending_poller_returns_first_ready_body() {
    let answers = RefCell::new(vec![None, None, Some("packages")]);
    let sleeps = RefCell::new(Vec::new());
    let poller = PendingPoller {
        interval: Duration::from_secs(3),
        max_attempts: 10,
    };

    let body = poller
        .wait_with_sleep(
            || Ok::<_, &'static str>(answers.borrow_mut().remove(0)),
            || "exhausted",
            |d| sleeps.borrow_mut().push(d),
        )
        .unwrap();

    assert_eq!(body, "packages");
    assert_eq!(sleeps.borrow().len(), 2);
}

#[test]
fn pending_poller_error_stops_immediately() {
    let calls = RefCell::new(0u32);
    let poller = PendingPoller::default();

    let err = poller
        .wait_with_sleep(
            || {
                *calls.borrow_mut() += 1;
                Err::<Option<()>, _>("HTTP 500")
            },
            || "exhausted",
            |_| {},
        )
        .unwrap_err();

    assert_eq!(err, "HTTP 500");
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn pending_poller_bound_is_enforced() {
    let calls = RefCell::new(0u32);
    let poller = PendingPoller {
        interval: Duration::from_secs(3),
        max_attempts: 4,
    };

    let err = poller
        .wait_with_sleep(
            || {
                *calls.borrow_mut() += 1;
                Ok::<Option<()>, &'static str>(None)
            },
            || "exhausted",
            |_| {},
        )
        .unwrap_err();

    assert_eq!(err, "exhausted");
    assert_eq!(*calls.borrow(), 4);
}

#[test]
fn tokens_are_independent() {
    let first = CancelToken::new();
    let second = CancelToken::new();
    first.cancel();
    assert!(first.is_cancelled());
    assert!(!second.is_cancelled());
}
