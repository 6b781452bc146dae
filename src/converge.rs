//! Poll-converge: probe at a fixed interval until the observed state matches the
//! desired one or the deadline passes.
use std::{
    thread,
    time::{Duration, Instant},
};
use strum_macros::Display;
use tracing::debug;

use crate::constants::{DEFAULT_CONVERGE_TIMEOUT, DEFAULT_POLL_INTERVAL};
use crate::probe::ObservedState;

/// State a lifecycle operation is driving the daemon towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DesiredState {
    Stopped,
    Running,
}

impl DesiredState {
    /// Whether `observed` satisfies this desired state.
    pub fn is_satisfied_by(&self, observed: &ObservedState) -> bool {
        match self {
            DesiredState::Running => observed.is_running(),
            DesiredState::Stopped => !observed.is_running(),
        }
    }
}

/// Interval and deadline for a convergence wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergePolicy {
    /// Pause between probes.
    pub interval: Duration,
    /// Total time allowed before giving up.
    pub timeout: Duration,
}

impl Default for ConvergePolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_CONVERGE_TIMEOUT,
        }
    }
}

/// Result of a convergence wait that did not hit a probe error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// The desired state was observed.
    Converged(ObservedState),
    /// The deadline passed first.
    TimedOut {
        /// Last state observed before giving up.
        last: ObservedState,
        /// Time spent waiting.
        waited: Duration,
    },
}

/// Probes until `desired` is observed or `policy.timeout` elapses.
///
/// The first probe runs immediately. Sleeps never overrun the deadline, and a final
/// probe is taken at the deadline before reporting a timeout, so a timeout is reported
/// no earlier than `policy.timeout` and no later than one interval after it.
/// A probe error ends the wait at once.
pub fn poll_until<F, E>(
    desired: DesiredState,
    policy: ConvergePolicy,
    mut probe: F,
) -> Result<Convergence, E>
where
    F: FnMut() -> Result<ObservedState, E>,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;

    loop {
        let observed = probe()?;
        if desired.is_satisfied_by(&observed) {
            debug!("Converged to {desired} after {:?}", started.elapsed());
            return Ok(Convergence::Converged(observed));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(Convergence::TimedOut {
                last: observed,
                waited: now - started,
            });
        }

        thread::sleep(policy.interval.min(deadline - now));
    }
}
