use actuator_core::config::PollConfig;
use actuator_core::job::{job_state, JobState};
use std::time::Duration;
use tracing::{debug, info};

use crate::client::PlatformClient;
use crate::error::{Error, Result};

/// Polls a submitted job until it reaches a terminal condition or the poll
/// budget runs out.
#[derive(Debug, Clone, PartialEq)]
pub struct Poller {
    pub interval: Duration,
    /// Polls before giving up; negative polls until terminal.
    pub retries: i32,
}

impl Default for Poller {
    fn default() -> Self {
        Self::from_config(&PollConfig::default())
    }
}

impl Poller {
    pub fn from_config(cfg: &PollConfig) -> Self {
        Self {
            interval: Duration::from_secs(cfg.interval_secs),
            retries: cfg.retries,
        }
    }

    /// `Ok(())` on success; [`Error::JobFailed`] on a failed condition or a
    /// completion without successes; [`Error::JobInProgress`] when the
    /// budget is spent. Fetch errors end polling immediately.
    pub async fn wait(
        &self,
        platform: &dyn PlatformClient,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        info!(job = %name, retries = self.retries, "waiting for job");
        let mut job = platform.get_job(namespace, name, None).await?;

        let mut polls = 0;
        loop {
            match job_state(&job) {
                JobState::Succeeded => {
                    info!(job = %name, "job complete");
                    return Ok(());
                }
                JobState::Failed(message) => {
                    return Err(Error::JobFailed {
                        job: name.to_string(),
                        message,
                    });
                }
                JobState::Pending => {}
            }

            if self.retries >= 0 && polls >= self.retries {
                return Err(Error::JobInProgress {
                    job: name.to_string(),
                });
            }

            tokio::time::sleep(self.interval).await;

            let resource_version = job.metadata.resource_version.clone();
            debug!(job = %name, ?resource_version, "re-fetching job");
            job = platform.get_job(namespace, name, resource_version).await?;
            polls += 1;
        }
    }
}
