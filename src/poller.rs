//! Readiness polling for resources that become usable asynchronously.
//!
//! Certificates take minutes to issue and distribution changes take minutes to
//! propagate. [`wait_until`] probes such a resource with capped exponential
//! backoff until it reports ready or the time budget runs out.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::{ProvisionError, Result};

/// Backoff and budget for one kind of wait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay before the second probe, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor applied after every pending probe.
    pub multiplier: f64,
    /// Total time budget, in seconds.
    pub timeout_secs: u64,
}

impl PollConfig {
    /// Defaults for certificate validation metadata and issuance.
    #[must_use]
    pub const fn certificate() -> Self {
        Self {
            initial_delay_ms: 2_000,
            max_delay_ms: 15_000,
            multiplier: 1.5,
            timeout_secs: 600,
        }
    }

    /// Defaults for distribution changes reaching `Deployed`.
    #[must_use]
    pub const fn distribution() -> Self {
        Self {
            initial_delay_ms: 15_000,
            max_delay_ms: 60_000,
            multiplier: 1.5,
            timeout_secs: 1_800,
        }
    }

    /// Returns the delay after the given zero-based pending probe.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        Duration::from_millis((delay as u64).min(self.max_delay_ms))
    }

    /// Returns the total time budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness<T> {
    /// The resource is usable; carries whatever the probe observed.
    Ready(T),
    /// Not yet; carries the status the provider reported.
    Pending(String),
}

/// Probes until ready, sleeping between pending probes.
///
/// The first probe runs immediately. Probe errors propagate at once. When the
/// next delay would exceed the budget, fails with
/// [`ProvisionError::Timeout`] carrying the last reported status.
///
/// # Errors
///
/// Returns the probe's error, or a timeout.
pub async fn wait_until<T, F, Fut>(resource: &str, config: &PollConfig, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Readiness<T>>>,
{
    let started = Instant::now();
    let budget = config.timeout();
    let mut attempt: u32 = 0;

    loop {
        let status = match probe().await? {
            Readiness::Ready(value) => return Ok(value),
            Readiness::Pending(status) => status,
        };

        let delay = config.delay_for_attempt(attempt);
        let waited = started.elapsed();
        if waited + delay >= budget {
            return Err(ProvisionError::Timeout {
                resource: resource.to_string(),
                last_status: status,
                waited_secs: waited.as_secs(),
            }
            .into());
        }

        debug!(
            "{resource} not ready (status: {status}), checking again in {}ms",
            delay.as_millis()
        );
        sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, SpaDeployError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> PollConfig {
        PollConfig {
            initial_delay_ms: 1,
            max_delay_ms: 2,
            multiplier: 2.0,
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_delay_grows_and_is_capped() {
        let config = PollConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            multiplier: 2.0,
            timeout_secs: 60,
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(800));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(1_000));
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_ready_on_first_probe() {
        let calls = AtomicU32::new(0);
        let value = wait_until("thing", &fast(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Readiness::Ready(7)) }
        })
        .await
        .expect("should be ready");

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pending_then_ready() {
        let calls = AtomicU32::new(0);
        let value = wait_until("certificate", &fast(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Ok(Readiness::Pending(String::from("PENDING_VALIDATION")))
                } else {
                    Ok(Readiness::Ready("ISSUED"))
                }
            }
        })
        .await
        .expect("should become ready");

        assert_eq!(value, "ISSUED");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_reports_last_status() {
        let config = PollConfig {
            initial_delay_ms: 5,
            max_delay_ms: 5,
            multiplier: 1.0,
            timeout_secs: 0,
        };
        let err = wait_until::<(), _, _>("distribution E1", &config, || async {
            Ok(Readiness::Pending(String::from("InProgress")))
        })
        .await
        .expect_err("should time out");

        match err {
            SpaDeployError::Provision(ProvisionError::Timeout {
                resource,
                last_status,
                ..
            }) => {
                assert_eq!(resource, "distribution E1");
                assert_eq!(last_status, "InProgress");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_probe_error_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let err = wait_until::<(), _, _>("certificate", &fast(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::request("acm", "DescribeCertificate", "denied").into()) }
        })
        .await
        .expect_err("should fail");

        assert!(matches!(err, SpaDeployError::Provider(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
