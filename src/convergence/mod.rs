//! Convergence verifier - poll an async operation until it settles
//!
//! Generalizes the "poll status, sleep, retry" loop into a single
//! combinator parameterized by predicate, cadence, and budget. The loop
//! never raises a hard failure itself; callers branch on the returned
//! [`Convergence`] outcome.

use crate::client::HostingService;
use crate::error::Result;
use crate::types::{Convergence, OperationStatus, RepositorySnapshot};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default maximum poll attempts
const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default pause between polls
const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Default wall-clock budget for one verification
const DEFAULT_DEADLINE: Duration = Duration::from_secs(300);

/// Default consecutive transport errors tolerated before failing fast
const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Budget for one verification call
///
/// `max_attempts` and `deadline` are both enforced; whichever triggers
/// first ends the loop. The interval is fixed, not exponential - the
/// awaited operations have roughly known durations and tolerate a flat
/// cadence.
#[derive(Debug, Clone)]
pub struct PollBudget {
    /// Maximum number of poll calls
    pub max_attempts: u32,
    /// Pause between consecutive polls
    pub interval: Duration,
    /// Wall-clock limit independent of attempt pacing
    pub deadline: Duration,
    /// Consecutive poll errors tolerated before the loop fails fast
    pub max_consecutive_errors: u32,
}

impl Default for PollBudget {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            deadline: DEFAULT_DEADLINE,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

impl PollBudget {
    /// Budget with a custom attempt count and interval, default deadline
    /// scaled to cover all attempts
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            deadline: interval
                .saturating_mul(max_attempts.saturating_add(1))
                .max(DEFAULT_DEADLINE),
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

/// Poll `poll` until `is_converged` holds or the budget runs out
///
/// `poll` must be idempotent and safe to invoke repeatedly. A poll that
/// errors counts as a non-converged observation unless
/// `max_consecutive_errors` errors arrive in a row, at which point the
/// loop ends with outcome `Failed` and the error attached.
///
/// Converging on attempt k sleeps exactly k-1 times. If the condition
/// never holds, exactly min(`max_attempts`, attempts fitting in
/// `deadline`) polls are performed. A budget that admits no poll (zero
/// attempts or a zero deadline) fails immediately with `attempts == 0`
/// and no snapshot.
///
/// Holds no shared state; concurrent verifications for independent
/// resources need no coordination.
pub async fn await_convergence<S, P, Fut, C>(
    poll: P,
    is_converged: C,
    budget: &PollBudget,
) -> Convergence<S>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<S>>,
    C: Fn(&S) -> bool,
{
    // A fresh token is never cancelled, so the plain variant is just the
    // cancellable one without an external trigger.
    await_convergence_cancellable(poll, is_converged, budget, &CancellationToken::new()).await
}

/// [`await_convergence`] with cooperative cancellation
///
/// The token is checked between attempts (never mid-poll). Cancellation
/// ends the loop with outcome `Failed`, the last observed snapshot, and a
/// "cancelled" note in `last_error`.
pub async fn await_convergence_cancellable<S, P, Fut, C>(
    mut poll: P,
    is_converged: C,
    budget: &PollBudget,
    cancel: &CancellationToken,
) -> Convergence<S>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<S>>,
    C: Fn(&S) -> bool,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;
    let mut consecutive_errors: u32 = 0;
    let mut final_state: Option<S> = None;
    let mut last_error: Option<String> = None;

    // A budget that admits no poll fails without touching the resource.
    if budget.max_attempts == 0 || budget.deadline.is_zero() {
        debug!("budget admits no poll");
        return Convergence {
            final_state: None,
            attempts: 0,
            elapsed: started.elapsed(),
            outcome: OperationStatus::Failed,
            last_error: None,
        };
    }

    loop {
        attempts += 1;
        match poll().await {
            Ok(snapshot) => {
                consecutive_errors = 0;
                last_error = None;
                let done = is_converged(&snapshot);
                final_state = Some(snapshot);
                if done {
                    debug!(attempts, "operation converged");
                    return Convergence {
                        final_state,
                        attempts,
                        elapsed: started.elapsed(),
                        outcome: OperationStatus::Converged,
                        last_error: None,
                    };
                }
                debug!(attempts, "operation still pending");
            }
            Err(e) => {
                consecutive_errors += 1;
                debug!(attempts, consecutive_errors, error = %e, "poll failed");
                last_error = Some(e.to_string());
                if consecutive_errors >= budget.max_consecutive_errors {
                    return Convergence {
                        final_state,
                        attempts,
                        elapsed: started.elapsed(),
                        outcome: OperationStatus::Failed,
                        last_error,
                    };
                }
            }
        }

        if attempts >= budget.max_attempts {
            debug!(attempts, "attempt budget exhausted");
            break;
        }
        // Stop early if the next poll could not happen before the deadline.
        if started.elapsed() + budget.interval >= budget.deadline {
            debug!(attempts, "deadline budget exhausted");
            break;
        }

        tokio::select! {
            () = cancel.cancelled() => {
                debug!(attempts, "verification cancelled");
                last_error = Some("cancelled".to_string());
                break;
            }
            () = tokio::time::sleep(budget.interval) => {}
        }
    }

    Convergence {
        final_state,
        attempts,
        elapsed: started.elapsed(),
        outcome: OperationStatus::Failed,
        last_error,
    }
}

/// Wait for a repository import to finish
///
/// Polls [`HostingService::get_repository`] until the `importing` flag
/// clears.
pub async fn await_import(
    service: &dyn HostingService,
    budget: &PollBudget,
) -> Convergence<RepositorySnapshot> {
    await_convergence(|| service.get_repository(), |repo| !repo.importing, budget).await
}
