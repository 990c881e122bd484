// src/notify/retry.rs
//! Delivery retry state machine.
//!
//! `RetryPolicy::transition` is pure: given the attempt index, what the
//! transport reported, and the current backoff seed, it says whether to stop
//! or how long to wait before the next attempt. No I/O happens here.

use std::time::Duration;

/// What a single delivery attempt ended in.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// 2xx.
    Success,
    /// 429, with the server's `retry_after` hint in seconds if it sent one.
    RateLimited { retry_after: Option<f64> },
    /// 401/403. Retrying cannot help without operator action.
    AuthFailed { status: u16 },
    /// Any other well-formed error response.
    OtherFailure { status: u16, description: String },
    Timeout,
    ConnectionError(String),
}

/// Result of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Terminal. `true` only for `Success`.
    Done(bool),
    /// Sleep `wait`, attempt again, and use `next_delay` as the new seed.
    Retry { wait: Duration, next_delay: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// `attempt` is 0-based; `delay` is the current backoff seed.
    pub fn transition(&self, attempt: u32, outcome: &DeliveryOutcome, delay: Duration) -> Step {
        let retries_left = attempt < self.max_retries;
        match outcome {
            DeliveryOutcome::Success => Step::Done(true),

            DeliveryOutcome::RateLimited { retry_after } => {
                let hinted = retry_after
                    .and_then(|s| Duration::try_from_secs_f64(s).ok())
                    .unwrap_or(delay);
                let wait = hinted.min(self.max_delay);
                if retries_left {
                    Step::Retry {
                        wait,
                        next_delay: self.double(wait),
                    }
                } else {
                    Step::Done(false)
                }
            }

            DeliveryOutcome::Timeout => {
                if retries_left {
                    let wait = delay.min(self.max_delay);
                    Step::Retry {
                        wait,
                        next_delay: self.double(wait),
                    }
                } else {
                    Step::Done(false)
                }
            }

            DeliveryOutcome::AuthFailed { .. }
            | DeliveryOutcome::OtherFailure { .. }
            | DeliveryOutcome::ConnectionError(_) => Step::Done(false),
        }
    }

    fn double(&self, d: Duration) -> Duration {
        d.saturating_mul(2).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn success_is_terminal() {
        assert_eq!(
            policy().transition(0, &DeliveryOutcome::Success, secs(1)),
            Step::Done(true)
        );
    }

    #[test]
    fn rate_limit_honors_server_hint_then_doubles() {
        let step = policy().transition(
            0,
            &DeliveryOutcome::RateLimited {
                retry_after: Some(3.0),
            },
            secs(1),
        );
        assert_eq!(
            step,
            Step::Retry {
                wait: secs(3),
                next_delay: secs(6)
            }
        );
    }

    #[test]
    fn rate_limit_hint_is_clamped() {
        let step = policy().transition(
            1,
            &DeliveryOutcome::RateLimited {
                retry_after: Some(120.0),
            },
            secs(1),
        );
        assert_eq!(
            step,
            Step::Retry {
                wait: secs(10),
                next_delay: secs(10)
            }
        );
    }

    #[test]
    fn rate_limit_without_hint_uses_seed() {
        let step = policy().transition(
            0,
            &DeliveryOutcome::RateLimited { retry_after: None },
            secs(2),
        );
        assert_eq!(
            step,
            Step::Retry {
                wait: secs(2),
                next_delay: secs(4)
            }
        );
    }

    #[test]
    fn rate_limit_on_last_attempt_gives_up() {
        let p = policy();
        let step = p.transition(
            p.max_retries,
            &DeliveryOutcome::RateLimited {
                retry_after: Some(1.0),
            },
            secs(1),
        );
        assert_eq!(step, Step::Done(false));
        assert_eq!(p.max_attempts(), 4);
    }

    #[test]
    fn timeout_backs_off_exponentially_with_cap() {
        let p = policy();
        let mut delay = p.initial_delay;
        let mut waits = Vec::new();
        for attempt in 0..p.max_retries {
            match p.transition(attempt, &DeliveryOutcome::Timeout, delay) {
                Step::Retry { wait, next_delay } => {
                    waits.push(wait);
                    delay = next_delay;
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(waits, vec![secs(1), secs(2), secs(4)]);
        assert_eq!(
            p.transition(p.max_retries, &DeliveryOutcome::Timeout, delay),
            Step::Done(false)
        );
    }

    #[test]
    fn auth_connection_and_other_failures_never_retry() {
        let p = policy();
        for outcome in [
            DeliveryOutcome::AuthFailed { status: 401 },
            DeliveryOutcome::AuthFailed { status: 403 },
            DeliveryOutcome::ConnectionError("refused".into()),
            DeliveryOutcome::OtherFailure {
                status: 400,
                description: "Bad Request: chat not found".into(),
            },
        ] {
            assert_eq!(p.transition(0, &outcome, secs(1)), Step::Done(false));
        }
    }

    #[test]
    fn negative_hint_falls_back_to_seed() {
        let step = policy().transition(
            0,
            &DeliveryOutcome::RateLimited {
                retry_after: Some(-5.0),
            },
            secs(1),
        );
        assert_eq!(
            step,
            Step::Retry {
                wait: secs(1),
                next_delay: secs(2)
            }
        );
    }
}
