//! Waiting for a freshly launched task to come up.
//!
//! `HealthState::next` is the pure transition from one describe result to the
//! next state; `wait_for_healthy` drives it with the fixed poll timing.

use bon::Builder;
use lifecycle_core::{TaskRunner, TaskSnapshot, TaskStatus};
use std::time::Duration;
use tracing::info;

use crate::StartError;

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const MAX_ATTEMPTS: u32 = 60;
/// Time given to the VPC link to register the new target after RUNNING.
pub const ROUTING_GRACE_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct HealthCheckSettings {
    #[builder(default = POLL_INTERVAL)]
    pub poll_interval: Duration,
    #[builder(default = MAX_ATTEMPTS)]
    pub max_attempts: u32,
    #[builder(default = ROUTING_GRACE_PERIOD)]
    pub grace_period: Duration,
}

impl Default for HealthCheckSettings {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            max_attempts: MAX_ATTEMPTS,
            grace_period: ROUTING_GRACE_PERIOD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthState {
    Pending,
    Running,
    Stopped { reason: String },
    TimedOut,
}

impl HealthState {
    /// State after observing `snapshot` on poll number `attempt` (1-based).
    pub fn next(attempt: u32, max_attempts: u32, snapshot: &TaskSnapshot) -> Self {
        match snapshot.last_status {
            TaskStatus::Running => Self::Running,
            TaskStatus::Stopped => Self::Stopped {
                reason: snapshot
                    .stopped_reason
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
            },
            _ if attempt >= max_attempts => Self::TimedOut,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Polls until the task is RUNNING, then waits out the grace period.
/// Returns the number of polls it took.
pub async fn wait_for_healthy<R>(
    runner: &R,
    cluster: &str,
    task_arn: &str,
    settings: &HealthCheckSettings,
) -> Result<u32, StartError>
where
    R: TaskRunner + ?Sized,
{
    info!(task_arn, "Waiting for task to be healthy");

    for attempt in 1..=settings.max_attempts {
        let snapshot = runner
            .describe_task(cluster, task_arn)
            .await
            .map_err(StartError::StatusCheck)?
            .ok_or_else(|| StartError::TaskNotFound(task_arn.to_string()))?;

        info!(
            status = %snapshot.last_status,
            attempt,
            max_attempts = settings.max_attempts,
            "Task status"
        );

        match HealthState::next(attempt, settings.max_attempts, &snapshot) {
            HealthState::Running => {
                tokio::time::sleep(settings.grace_period).await;
                info!("Task is running and should be reachable through API Gateway");
                return Ok(attempt);
            }
            HealthState::Stopped { reason } => {
                return Err(StartError::UnhealthyTermination { reason });
            }
            HealthState::TimedOut => break,
            HealthState::Pending => tokio::time::sleep(settings.poll_interval).await,
        }
    }

    Err(StartError::HealthTimeout {
        attempts: settings.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_is_terminal_on_any_attempt() {
        let running = TaskSnapshot::new(TaskStatus::Running);
        assert_eq!(HealthState::next(1, 60, &running), HealthState::Running);
        assert_eq!(HealthState::next(60, 60, &running), HealthState::Running);
    }

    #[test]
    fn test_stopped_carries_reason() {
        let stopped = TaskSnapshot::stopped("CannotPullContainerError");
        assert_eq!(
            HealthState::next(3, 60, &stopped),
            HealthState::Stopped {
                reason: "CannotPullContainerError".to_string()
            }
        );

        let no_reason = TaskSnapshot::new(TaskStatus::Stopped);
        assert_eq!(
            HealthState::next(3, 60, &no_reason),
            HealthState::Stopped {
                reason: "Unknown".to_string()
            }
        );
    }

    #[test]
    fn test_pending_until_last_attempt() {
        let pending = TaskSnapshot::new(TaskStatus::Provisioning);
        assert_eq!(HealthState::next(1, 60, &pending), HealthState::Pending);
        assert_eq!(HealthState::next(59, 60, &pending), HealthState::Pending);
        assert_eq!(HealthState::next(60, 60, &pending), HealthState::TimedOut);
    }

    #[test]
    fn test_stopped_wins_over_timeout() {
        let stopped = TaskSnapshot::stopped("OutOfMemory");
        assert!(matches!(
            HealthState::next(60, 60, &stopped),
            HealthState::Stopped { .. }
        ));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!HealthState::Pending.is_terminal());
        assert!(HealthState::Running.is_terminal());
        assert!(HealthState::TimedOut.is_terminal());
    }

    #[test]
    fn test_default_settings() {
        let settings = HealthCheckSettings::default();
        assert_eq!(settings, HealthCheckSettings::builder().build());
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.max_attempts, 60);
        assert_eq!(settings.grace_period, Duration::from_secs(10));
    }
}
