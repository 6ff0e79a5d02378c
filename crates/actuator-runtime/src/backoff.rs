use actuator_core::config::SubmitConfig;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{Error, Result};

/// Exponential backoff: `steps` attempts, sleeping `initial`, then
/// `initial * factor`, ... between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub factor: f64,
    pub steps: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&SubmitConfig::default())
    }
}

impl Backoff {
    pub fn from_config(cfg: &SubmitConfig) -> Self {
        Self {
            initial: Duration::from_millis(cfg.initial_delay_ms),
            factor: cfg.factor,
            steps: cfg.steps,
        }
    }

    /// The sleeps taken between attempts.
    pub fn delays(&self) -> Vec<Duration> {
        let initial = self.initial.as_nanos() as f64;
        (1..self.steps.max(1))
            .map(|i| {
                let nanos = initial * self.factor.powi(i as i32 - 1);
                Duration::from_nanos(nanos.round() as u64)
            })
            .collect()
    }

    /// Run `op` until it succeeds or the attempts run out. `op` receives the
    /// 1-based attempt number. Exhaustion yields [`Error::Submission`]
    /// wrapping the last failure.
    pub async fn retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delays = self.delays().into_iter();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => match delays.next() {
                    Some(delay) => {
                        warn!(attempt, ?delay, "attempt failed, retrying: {e}");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        return Err(Error::Submission {
                            attempts: attempt,
                            last: Box::new(e),
                        })
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_delays_grow_by_factor() {
        let delays = Backoff::default().delays();
        assert_eq!(delays.len(), 4);
        assert_eq!(delays[0], Duration::from_millis(1000));
        assert_eq!(delays[1], Duration::from_millis(1200));
        assert_eq!(delays[2], Duration::from_millis(1440));
    }

    #[test]
    fn zero_steps_means_one_attempt() {
        let b = Backoff {
            steps: 0,
            ..Backoff::default()
        };
        assert!(b.delays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let out = Backoff::default()
            .retry(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(Error::AlreadyExists("not really".into()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(out, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_attempts_and_last_error() {
        let err = Backoff::default()
            .retry(|attempt| async move {
                Err::<(), _>(Error::JobInProgress {
                    job: format!("attempt-{attempt}"),
                })
            })
            .await
            .unwrap_err();
        match err {
            Error::Submission { attempts, last } => {
                assert_eq!(attempts, 5);
                assert!(last.to_string().contains("attempt-5"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
