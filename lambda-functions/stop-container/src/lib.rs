use chrono::Utc;
use futures::FutureExt;
use lifecycle_core::dns::remove_alias_record;
use lifecycle_core::{
    DesiredStatus, DnsZone, ErrorBody, StepOutcome, StopConfig, TaskRunner, WorkflowEngine,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use thiserror::Error;
use tracing::{error, info, warn};

pub const STOP_REASON: &str = "Manual stop or auto-shutdown triggered";
pub const CANCEL_ERROR_CODE: &str = "ManualStop";
pub const CANCEL_CAUSE: &str = "User requested manual stop";
pub const STOPPED_MESSAGE: &str = "Container stopped successfully";

/// Sent either by the control API (manual stop, usually empty) or by the
/// auto-shutdown workflow (carries `taskArn`).
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub task_arn: Option<String>,
    pub execution_arn: Option<String>,
    pub source_ip: Option<String>,
}

impl Request {
    pub fn task_arn(&self) -> Option<&str> {
        non_empty(&self.task_arn)
    }

    pub fn execution_arn(&self) -> Option<&str> {
        non_empty(&self.execution_arn)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoppedBody {
    pub message: String,
    pub task_arn: Option<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StopBody {
    Stopped(StoppedBody),
    Failed(ErrorBody),
}

pub type Response = lifecycle_core::Response<StopBody>;

#[derive(Debug, Error)]
pub enum StopError {
    /// Something escaped every per-step guard.
    #[error("{0}")]
    Unexpected(String),
}

impl StopError {
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown error".to_string());
        Self::Unexpected(message)
    }
}

pub struct StopService<R, D, W> {
    runner: R,
    dns: D,
    workflow: W,
}

impl<R, D, W> StopService<R, D, W>
where
    R: TaskRunner,
    D: DnsZone,
    W: WorkflowEngine,
{
    pub fn new(runner: R, dns: D, workflow: W) -> Self {
        Self {
            runner,
            dns,
            workflow,
        }
    }

    /// First task the cluster wants running. Lookup failures count as none.
    pub async fn find_running_task(&self, config: &StopConfig) -> Option<String> {
        info!(cluster = %config.cluster_name, "Looking for running tasks");

        match self
            .runner
            .list_tasks(&config.cluster_name, DesiredStatus::Running)
            .await
        {
            Ok(task_arns) => task_arns.into_iter().next(),
            Err(e) => {
                warn!(error = %e, "Error finding running task");
                None
            }
        }
    }

    pub async fn stop_task(&self, config: &StopConfig, task_arn: &str) -> StepOutcome {
        info!(task_arn, "Stopping ECS task");

        match self
            .runner
            .stop_task(&config.cluster_name, task_arn, STOP_REASON)
            .await
        {
            Ok(()) => {
                info!("Task stopped");
                StepOutcome::Completed(format!("Task {task_arn} stopped"))
            }
            Err(e) => {
                warn!(error = %e, "Error stopping task");
                StepOutcome::Warning(format!("Failed to stop task: {e}"))
            }
        }
    }

    /// The execution may already have finished, so failures are only logged.
    pub async fn cancel_workflow(&self, execution_arn: &str) -> StepOutcome {
        info!(execution_arn, "Canceling Step Functions execution");

        match self
            .workflow
            .stop_execution(execution_arn, CANCEL_ERROR_CODE, CANCEL_CAUSE)
            .await
        {
            Ok(()) => {
                info!("Workflow canceled");
                StepOutcome::Completed(format!("Execution {execution_arn} canceled"))
            }
            Err(e) => {
                warn!(error = %e, "Error canceling workflow");
                StepOutcome::Warning(format!("Failed to cancel workflow: {e}"))
            }
        }
    }

    pub async fn stop(&self, config: &StopConfig, request: &Request) -> StoppedBody {
        info!(
            task_arn = request.task_arn().unwrap_or_default(),
            source_ip = request.source_ip.as_deref().unwrap_or("unknown"),
            "Stopping vault container"
        );

        let task_arn = match request.task_arn() {
            Some(arn) => Some(arn.to_string()),
            None => self.find_running_task(config).await,
        };

        let mut outcomes = Vec::new();
        match &task_arn {
            Some(arn) => outcomes.push(self.stop_task(config, arn).await),
            None => info!("No running task found"),
        }

        outcomes.push(remove_alias_record(&self.dns, &config.hosted_zone_id, &config.fqdn).await);

        if let Some(execution_arn) = request.execution_arn() {
            outcomes.push(self.cancel_workflow(execution_arn).await);
        }

        StoppedBody {
            message: STOPPED_MESSAGE.to_string(),
            task_arn,
            timestamp: Utc::now().to_rfc3339(),
            warnings: outcomes
                .iter()
                .filter_map(StepOutcome::warning)
                .map(str::to_string)
                .collect(),
        }
    }

    /// Runs the stop flow. Every step is best-effort, so the only failure
    /// left is a fault that escapes them.
    pub async fn handle(&self, config: &StopConfig, request: &Request) -> Response {
        let result = AssertUnwindSafe(self.stop(config, request))
            .catch_unwind()
            .await
            .map_err(StopError::from_panic);

        match result {
            Ok(body) => Response::ok(StopBody::Stopped(body)),
            Err(e) => {
                error!(error = %e, "Error stopping container");
                Response::with_status(
                    500,
                    StopBody::Failed(ErrorBody::new(format!(
                        "Failed to stop container: {e}"
                    ))),
                )
            }
        }
    }
}
