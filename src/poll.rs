use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{Instant, sleep};

/// The states of a provisioning wait.
///
/// Each wait flows through: REQUESTED → POLLING → SATISFIED | FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollState {
    /// The creation request was accepted; nothing probed yet.
    Requested,
    /// At least one probe ran without observing the terminal condition.
    Polling { attempt: u32 },
    /// The terminal condition was observed. Absorbing.
    Satisfied { attempts: u32 },
    /// A fatal error or the timeout ended the wait. Absorbing.
    Failed { attempts: u32 },
}

impl std::fmt::Display for PollState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollState::Requested => write!(f, "REQUESTED"),
            PollState::Polling { .. } => write!(f, "POLLING"),
            PollState::Satisfied { .. } => write!(f, "SATISFIED"),
            PollState::Failed { .. } => write!(f, "FAILED"),
        }
    }
}

/// What a single probe observed, already classified by the caller.
///
/// Retryable errors (connectivity, not-ready) map to `Pending` with the
/// error message as status; only fatal errors map to `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<T> {
    /// Terminal condition observed; the wait is over.
    Ready(T),
    /// Not there yet. Carries a status label for progress output.
    Pending(String),
    /// Fatal error; abort the wait immediately.
    Failed(String),
}

impl PollState {
    /// Compute the next state from a probe observation.
    ///
    /// `Satisfied` and `Failed` are absorbing: once terminal, further
    /// observations do not change the state. Attempt counts only grow.
    pub fn next<T>(self, probe: &Probe<T>) -> PollState {
        let attempts = self.attempts() + 1;
        match self {
            PollState::Satisfied { attempts } => PollState::Satisfied { attempts },
            PollState::Failed { attempts } => PollState::Failed { attempts },
            PollState::Requested | PollState::Polling { .. } => match probe {
                Probe::Ready(_) => PollState::Satisfied { attempts },
                Probe::Pending(_) => PollState::Polling { attempt: attempts },
                Probe::Failed(_) => PollState::Failed { attempts },
            },
        }
    }

    /// Number of probes observed so far.
    pub fn attempts(&self) -> u32 {
        match self {
            PollState::Requested => 0,
            PollState::Polling { attempt } => *attempt,
            PollState::Satisfied { attempts } | PollState::Failed { attempts } => *attempts,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Satisfied { .. } | PollState::Failed { .. })
    }
}

/// Delay and deadline configuration for a polling wait.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Base delay between probes.
    pub interval: Duration,
    /// Ceiling for the exponentially growing delay.
    pub max_interval: Duration,
    /// Overall deadline for the wait, measured from the first probe.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(240),
            timeout: Duration::from_secs(45 * 60),
        }
    }
}

impl PollPolicy {
    /// Calculate the delay after a given attempt using exponential backoff.
    /// delay = min(interval * 2^(attempt - 1), max_interval)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.interval.saturating_mul(2u32.pow(exp));
        delay.min(self.max_interval)
    }
}

/// Why a polling wait ended without observing its terminal condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("fatal error on attempt {attempts}: {message}")]
    Fatal { attempts: u32, message: String },

    #[error("timed out after {attempts} attempts ({waited_secs}s)")]
    TimedOut { attempts: u32, waited_secs: u64 },
}

/// A successful wait: the probed value plus how long it took to appear.
#[derive(Debug)]
pub struct Polled<T> {
    pub value: T,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Repeatedly run `probe` until it reports `Ready`, sleeping between
/// attempts per `policy`.
///
/// `on_wait` is invoked with the attempt number and status label before
/// each sleep. The deadline is only checked after a `Pending` observation,
/// so a probe that succeeds is never discarded by the timeout.
pub async fn poll_until<T, F, Fut>(
    policy: &PollPolicy,
    mut probe: F,
    mut on_wait: impl FnMut(u32, &str),
) -> Result<Polled<T>, PollError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Probe<T>>,
{
    let started = Instant::now();
    let mut state = PollState::Requested;

    loop {
        let attempt = state.attempts() + 1;
        let observed = probe(attempt).await;
        state = state.next(&observed);

        match observed {
            Probe::Ready(value) => {
                return Ok(Polled {
                    value,
                    attempts: state.attempts(),
                    elapsed: started.elapsed(),
                });
            }
            Probe::Failed(message) => {
                return Err(PollError::Fatal {
                    attempts: state.attempts(),
                    message,
                });
            }
            Probe::Pending(status) => {
                if started.elapsed() >= policy.timeout {
                    return Err(PollError::TimedOut {
                        attempts: state.attempts(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
                on_wait(attempt, &status);
                sleep(policy.delay_for_attempt(attempt)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn state_walks_to_satisfied() {
        let state = PollState::Requested;
        let state = state.next(&Probe::<()>::Pending("waiting".into()));
        assert_eq!(state, PollState::Polling { attempt: 1 });

        let state = state.next(&Probe::<()>::Pending("waiting".into()));
        assert_eq!(state, PollState::Polling { attempt: 2 });

        let state = state.next(&Probe::Ready(()));
        assert_eq!(state, PollState::Satisfied { attempts: 3 });
        assert!(state.is_terminal());
    }

    #[test]
    fn terminal_states_absorb() {
        let satisfied = PollState::Satisfied { attempts: 2 };
        assert_eq!(
            satisfied.next(&Probe::<()>::Pending("late".into())),
            PollState::Satisfied { attempts: 2 }
        );

        let failed = PollState::Failed { attempts: 4 };
        assert_eq!(failed.next(&Probe::Ready(())), PollState::Failed { attempts: 4 });
    }

    #[test]
    fn fatal_probe_fails_the_state() {
        let state = PollState::Requested.next(&Probe::<()>::Failed("bad key".into()));
        assert_eq!(state, PollState::Failed { attempts: 1 });
        assert!(state.is_terminal());
    }

    #[test]
    fn attempt_count_is_monotonic() {
        let mut state = PollState::Requested;
        let mut last = 0;
        for _ in 0..10 {
            state = state.next(&Probe::<()>::Pending("".into()));
            assert!(state.attempts() > last);
            last = state.attempts();
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_ceiling() {
        let policy = PollPolicy {
            interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(240),
            timeout: Duration::from_secs(3600),
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(60));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(120));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(240));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(240));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(240));
    }

    #[test]
    fn state_display() {
        assert_eq!(PollState::Requested.to_string(), "REQUESTED");
        assert_eq!(PollState::Polling { attempt: 1 }.to_string(), "POLLING");
        assert_eq!(PollState::Satisfied { attempts: 1 }.to_string(), "SATISFIED");
        assert_eq!(PollState::Failed { attempts: 1 }.to_string(), "FAILED");
    }

    #[tokio::test]
    async fn poll_until_returns_on_first_ready() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe_calls = calls.clone();

        let result = poll_until(
            &fast_policy(),
            move |_attempt| {
                let calls = probe_calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Probe::Pending(format!("waiting {n}"))
                    } else {
                        Probe::Ready(n)
                    }
                }
            },
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(result.value, 3);
        assert_eq!(result.attempts, 3);
        // Never probed past the first Ready.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn poll_until_aborts_on_fatal() {
        let result = poll_until(
            &fast_policy(),
            |attempt| async move {
                if attempt == 1 {
                    Probe::<()>::Pending("connecting".into())
                } else {
                    Probe::Failed("authentication failed".into())
                }
            },
            |_, _| {},
        )
        .await;

        assert_eq!(
            result.unwrap_err(),
            PollError::Fatal {
                attempts: 2,
                message: "authentication failed".into()
            }
        );
    }

    #[tokio::test]
    async fn poll_until_times_out() {
        let policy = PollPolicy {
            interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(5),
            timeout: Duration::from_millis(12),
        };

        let result = poll_until(
            &policy,
            |_| async { Probe::<()>::Pending("never ready".into()) },
            |_, _| {},
        )
        .await;

        assert!(matches!(result.unwrap_err(), PollError::TimedOut { attempts, .. } if attempts >= 2));
    }

    #[tokio::test]
    async fn poll_until_reports_waits() {
        let mut seen = Vec::new();
        poll_until(
            &fast_policy(),
            |attempt| async move {
                if attempt < 3 {
                    Probe::Pending("loading".into())
                } else {
                    Probe::Ready(())
                }
            },
            |attempt, status| seen.push((attempt, status.to_string())),
        )
        .await
        .unwrap();

        assert_eq!(seen, vec![(1, "loading".into()), (2, "loading".into())]);
    }
}
