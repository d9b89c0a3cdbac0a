use async_trait::async_trait;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, DesiredStatus as EcsDesiredStatus, LaunchType,
    NetworkConfiguration,
};
use aws_sdk_ecs::Client as EcsClient;
use std::fmt;
use tracing::{info, warn};

use crate::config::StartConfig;
use crate::error::ApiError;

/// `lastStatus` of an ECS task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Provisioning,
    Pending,
    Activating,
    Running,
    Deactivating,
    Stopping,
    Deprovisioning,
    Stopped,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Provisioning => "PROVISIONING",
            Self::Pending => "PENDING",
            Self::Activating => "ACTIVATING",
            Self::Running => "RUNNING",
            Self::Deactivating => "DEACTIVATING",
            Self::Stopping => "STOPPING",
            Self::Deprovisioning => "DEPROVISIONING",
            Self::Stopped => "STOPPED",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "PROVISIONING" => Self::Provisioning,
            "PENDING" => Self::Pending,
            "ACTIVATING" => Self::Activating,
            "RUNNING" => Self::Running,
            "DEACTIVATING" => Self::Deactivating,
            "STOPPING" => Self::Stopping,
            "DEPROVISIONING" => Self::Deprovisioning,
            "STOPPED" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `desiredStatus` filter accepted by ListTasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredStatus {
    Running,
    Pending,
    Stopped,
}

impl DesiredStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Pending => "PENDING",
            Self::Stopped => "STOPPED",
        }
    }
}

impl From<DesiredStatus> for EcsDesiredStatus {
    fn from(status: DesiredStatus) -> Self {
        match status {
            DesiredStatus::Running => EcsDesiredStatus::Running,
            DesiredStatus::Pending => EcsDesiredStatus::Pending,
            DesiredStatus::Stopped => EcsDesiredStatus::Stopped,
        }
    }
}

/// What describe reports about one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub last_status: TaskStatus,
    pub stopped_reason: Option<String>,
}

impl TaskSnapshot {
    pub fn new(last_status: TaskStatus) -> Self {
        Self {
            last_status,
            stopped_reason: None,
        }
    }

    pub fn stopped(reason: impl Into<String>) -> Self {
        Self {
            last_status: TaskStatus::Stopped,
            stopped_reason: Some(reason.into()),
        }
    }
}

/// A Fargate launch of a single task in private subnets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub cluster: String,
    pub task_definition: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub count: i32,
}

impl LaunchRequest {
    pub fn from_config(config: &StartConfig) -> Self {
        Self {
            cluster: config.cluster_name.clone(),
            task_definition: config.task_definition.clone(),
            subnets: config.subnet_ids.clone(),
            security_groups: vec![config.security_group_id.clone()],
            count: 1,
        }
    }
}

/// The container task runner.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Returns the ARNs of the tasks that were started.
    async fn run_task(&self, request: &LaunchRequest) -> Result<Vec<String>, ApiError>;

    /// `None` when the cluster does not know the task.
    async fn describe_task(
        &self,
        cluster: &str,
        task_arn: &str,
    ) -> Result<Option<TaskSnapshot>, ApiError>;

    async fn list_tasks(
        &self,
        cluster: &str,
        desired_status: DesiredStatus,
    ) -> Result<Vec<String>, ApiError>;

    async fn stop_task(&self, cluster: &str, task_arn: &str, reason: &str)
        -> Result<(), ApiError>;
}

pub struct EcsTaskRunner {
    client: EcsClient,
}

impl EcsTaskRunner {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: EcsClient::new(config),
        }
    }
}

#[async_trait]
impl TaskRunner for EcsTaskRunner {
    async fn run_task(&self, request: &LaunchRequest) -> Result<Vec<String>, ApiError> {
        let vpc = AwsVpcConfiguration::builder()
            .set_subnets(Some(request.subnets.clone()))
            .set_security_groups(Some(request.security_groups.clone()))
            // Private subnets only; the task is reached through the VPC link.
            .assign_public_ip(AssignPublicIp::Disabled)
            .build()
            .map_err(|e| ApiError::from_sdk("ecs:RunTask", e))?;

        let output = self
            .client
            .run_task()
            .cluster(&request.cluster)
            .task_definition(&request.task_definition)
            .launch_type(LaunchType::Fargate)
            .network_configuration(
                NetworkConfiguration::builder()
                    .awsvpc_configuration(vpc)
                    .build(),
            )
            .count(request.count)
            .send()
            .await
            .map_err(|e| ApiError::from_sdk("ecs:RunTask", e))?;

        for failure in output.failures() {
            warn!(
                arn = failure.arn().unwrap_or_default(),
                reason = failure.reason().unwrap_or_default(),
                "ECS reported a launch failure"
            );
        }

        let task_arns: Vec<String> = output
            .tasks()
            .iter()
            .filter_map(|task| task.task_arn().map(str::to_string))
            .collect();

        if task_arns.is_empty() {
            let reasons: Vec<&str> = output
                .failures()
                .iter()
                .filter_map(|failure| failure.reason())
                .collect();
            if !reasons.is_empty() {
                return Err(ApiError::new("ecs:RunTask", reasons.join("; ")));
            }
        }

        info!(count = task_arns.len(), "RunTask returned");
        Ok(task_arns)
    }

    async fn describe_task(
        &self,
        cluster: &str,
        task_arn: &str,
    ) -> Result<Option<TaskSnapshot>, ApiError> {
        let output = self
            .client
            .describe_tasks()
            .cluster(cluster)
            .tasks(task_arn)
            .send()
            .await
            .map_err(|e| ApiError::from_sdk("ecs:DescribeTasks", e))?;

        Ok(output.tasks().first().map(|task| TaskSnapshot {
            last_status: TaskStatus::from(task.last_status().unwrap_or_default()),
            stopped_reason: task.stopped_reason().map(str::to_string),
        }))
    }

    async fn list_tasks(
        &self,
        cluster: &str,
        desired_status: DesiredStatus,
    ) -> Result<Vec<String>, ApiError> {
        let output = self
            .client
            .list_tasks()
            .cluster(cluster)
            .desired_status(EcsDesiredStatus::from(desired_status))
            .send()
            .await
            .map_err(|e| ApiError::from_sdk("ecs:ListTasks", e))?;

        Ok(output.task_arns().to_vec())
    }

    async fn stop_task(
        &self,
        cluster: &str,
        task_arn: &str,
        reason: &str,
    ) -> Result<(), ApiError> {
        self.client
            .stop_task()
            .cluster(cluster)
            .task(task_arn)
            .reason(reason)
            .send()
            .await
            .map_err(|e| ApiError::from_sdk("ecs:StopTask", e))?;

        Ok(())
    }
}
