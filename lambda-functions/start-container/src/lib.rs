use chrono::Utc;
use lifecycle_core::dns::{publish_alias, DnsRecord};
use lifecycle_core::{
    ApiError, DnsZone, ErrorBody, LaunchRequest, ShutdownWorkflowInput, StartConfig,
    StepOutcome, TaskRunner, WorkflowEngine,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

pub mod health;

pub use health::{wait_for_healthy, HealthCheckSettings, HealthState};

pub const STARTED_MESSAGE: &str = "Container started successfully";

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Caller address, only used for logging.
    pub source_ip: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartedBody {
    pub message: String,
    pub url: String,
    pub task_arn: String,
    pub execution_arn: String,
    pub auto_shutdown_minutes: u32,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StartBody {
    Started(StartedBody),
    Failed(ErrorBody),
}

pub type Response = lifecycle_core::Response<StartBody>;

#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to start ECS task: {0}")]
    Launch(String),

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("could not read task status: {0}")]
    StatusCheck(#[source] ApiError),

    #[error("task stopped unexpectedly: {reason}")]
    UnhealthyTermination { reason: String },

    #[error("timeout waiting for task to be healthy after {attempts} attempts")]
    HealthTimeout { attempts: u32 },

    #[error("failed to start auto-shutdown workflow: {0}")]
    Schedule(String),
}

pub struct StartService<R, D, W> {
    runner: R,
    dns: D,
    workflow: W,
    health: HealthCheckSettings,
}

impl<R, D, W> StartService<R, D, W>
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
            health: HealthCheckSettings::default(),
        }
    }

    pub fn with_health_settings(mut self, health: HealthCheckSettings) -> Self {
        self.health = health;
        self
    }

    pub async fn launch_task(&self, config: &StartConfig) -> Result<String, StartError> {
        info!(
            cluster = %config.cluster_name,
            task_definition = %config.task_definition,
            container = %config.container_name,
            "Starting ECS task"
        );

        let task_arns = self
            .runner
            .run_task(&LaunchRequest::from_config(config))
            .await
            .map_err(|e| StartError::Launch(e.to_string()))?;

        let task_arn = task_arns
            .into_iter()
            .next()
            .ok_or_else(|| StartError::Launch("RunTask returned no tasks".to_string()))?;

        info!(task_arn = %task_arn, "Task started");
        Ok(task_arn)
    }

    pub async fn publish_dns(&self, config: &StartConfig) -> StepOutcome {
        let record = DnsRecord::alias(
            &config.fqdn,
            &config.entry_point_domain_name,
            &config.entry_point_hosted_zone_id,
        );
        publish_alias(&self.dns, &config.hosted_zone_id, record).await
    }

    pub async fn schedule_shutdown(
        &self,
        config: &StartConfig,
        task_arn: &str,
    ) -> Result<String, StartError> {
        info!("Starting auto-shutdown workflow");

        let input = serde_json::to_string(&ShutdownWorkflowInput::new(config, task_arn))
            .map_err(|e| StartError::Schedule(e.to_string()))?;

        let execution_arn = self
            .workflow
            .start_execution(&config.state_machine_arn, &input)
            .await
            .map_err(|e| StartError::Schedule(e.to_string()))?;

        info!(execution_arn = %execution_arn, "Workflow started");
        Ok(execution_arn)
    }

    pub async fn start(
        &self,
        config: &StartConfig,
        request: &Request,
    ) -> Result<StartedBody, StartError> {
        let source_ip = request.source_ip.as_deref().unwrap_or("unknown");
        info!(source_ip, "Starting vault container");

        let task_arn = self.launch_task(config).await?;
        wait_for_healthy(&self.runner, &config.cluster_name, &task_arn, &self.health).await?;

        let dns = self.publish_dns(config).await;
        let execution_arn = self.schedule_shutdown(config, &task_arn).await?;

        Ok(StartedBody {
            message: STARTED_MESSAGE.to_string(),
            url: config.public_url(),
            task_arn,
            execution_arn,
            auto_shutdown_minutes: config.auto_shutdown_minutes,
            timestamp: Utc::now().to_rfc3339(),
            warnings: dns.warning().map(str::to_string).into_iter().collect(),
        })
    }

    /// Runs the start flow and folds any failure into a 500 response.
    pub async fn handle(&self, config: &StartConfig, request: &Request) -> Response {
        match self.start(config, request).await {
            Ok(body) => Response::ok(StartBody::Started(body)),
            Err(e) => {
                error!(error = %e, "Error starting container");
                Response::with_status(
                    500,
                    StartBody::Failed(ErrorBody::new(format!(
                        "Failed to start container: {e}"
                    ))),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialization() {
        let json = r#"{"sourceIp": "203.0.113.42"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(request.source_ip, Some("203.0.113.42".to_string()));

        let json_empty = r#"{}"#;
        let request_empty: Request = serde_json::from_str(json_empty).unwrap();
        assert_eq!(request_empty.source_ip, None);
    }

    #[test]
    fn test_started_body_serialization() {
        let body = StartedBody {
            message: STARTED_MESSAGE.to_string(),
            url: "https://vault.example.com".to_string(),
            task_arn: "arn:aws:ecs:us-east-1:123456789012:task/vault/abc".to_string(),
            execution_arn: "arn:aws:states:us-east-1:123456789012:execution:sm:1".to_string(),
            auto_shutdown_minutes: 30,
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            warnings: vec![],
        };

        let json = serde_json::to_string(&Response::ok(StartBody::Started(body))).unwrap();
        assert!(json.contains("\"statusCode\":200"));
        assert!(json.contains("\"url\":\"https://vault.example.com\""));
        assert!(json.contains("\"autoShutdownMinutes\":30"));
        assert!(!json.contains("warnings"));
    }

    #[test]
    fn test_error_messages() {
        let err = StartError::UnhealthyTermination {
            reason: "Essential container in task exited".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "task stopped unexpectedly: Essential container in task exited"
        );

        let err = StartError::HealthTimeout { attempts: 60 };
        assert!(err.to_string().contains("60 attempts"));
    }

    #[test]
    fn test_failed_body_round_trips_as_failed() {
        let body = StartBody::Failed(ErrorBody::new("Failed to start container: boom"));
        let json = serde_json::to_string(&body).unwrap();
        let parsed: StartBody = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, body);
    }
}
