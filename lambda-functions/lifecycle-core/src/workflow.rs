use async_trait::async_trait;
use aws_sdk_sfn::Client as SfnClient;
use serde::{Deserialize, Serialize};

use crate::config::StartConfig;
use crate::error::ApiError;

/// Input of the auto-shutdown state machine. It carries everything the stop
/// and cleanup functions need, so neither has to look anything up.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownWorkflowInput {
    pub task_arn: String,
    pub cluster_name: String,
    pub hosted_zone_id: String,
    pub fqdn: String,
    pub api_gateway_domain_name: String,
    pub api_gateway_hosted_zone_id: String,
}

impl ShutdownWorkflowInput {
    pub fn new(config: &StartConfig, task_arn: &str) -> Self {
        Self {
            task_arn: task_arn.to_string(),
            cluster_name: config.cluster_name.clone(),
            hosted_zone_id: config.hosted_zone_id.clone(),
            fqdn: config.fqdn.clone(),
            api_gateway_domain_name: config.entry_point_domain_name.clone(),
            api_gateway_hosted_zone_id: config.entry_point_hosted_zone_id.clone(),
        }
    }
}

/// The workflow engine running the auto-shutdown timer.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Returns the execution ARN.
    async fn start_execution(&self, state_machine_arn: &str, input: &str)
        -> Result<String, ApiError>;

    async fn stop_execution(
        &self,
        execution_arn: &str,
        error: &str,
        cause: &str,
    ) -> Result<(), ApiError>;
}

pub struct StepFunctionsEngine {
    client: SfnClient,
}

impl StepFunctionsEngine {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: SfnClient::new(config),
        }
    }
}

#[async_trait]
impl WorkflowEngine for StepFunctionsEngine {
    async fn start_execution(
        &self,
        state_machine_arn: &str,
        input: &str,
    ) -> Result<String, ApiError> {
        let output = self
            .client
            .start_execution()
            .state_machine_arn(state_machine_arn)
            .input(input)
            .send()
            .await
            .map_err(|e| ApiError::from_sdk("states:StartExecution", e))?;

        Ok(output.execution_arn().to_string())
    }

    async fn stop_execution(
        &self,
        execution_arn: &str,
        error: &str,
        cause: &str,
    ) -> Result<(), ApiError> {
        self.client
            .stop_execution()
            .execution_arn(execution_arn)
            .error(error)
            .cause(cause)
            .send()
            .await
            .map_err(|e| ApiError::from_sdk("states:StopExecution", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shutdown_input_wire_format() {
        let config = StartConfig::builder()
            .cluster_name("vault-cluster")
            .task_definition("vault-task:3")
            .subnet_ids(vec!["subnet-a".to_string()])
            .security_group_id("sg-123")
            .container_name("vault")
            .state_machine_arn("arn:sm")
            .entry_point_domain_name("d-abc123.execute-api.us-east-1.amazonaws.com")
            .entry_point_hosted_zone_id("Z1UJRXOUMOOFQ8")
            .hosted_zone_id("Z0EXAMPLE")
            .fqdn("vault.example.com")
            .build();

        let input = ShutdownWorkflowInput::new(&config, "arn:aws:ecs:task/1");
        let value = serde_json::to_value(&input).unwrap();

        assert_eq!(
            value,
            json!({
                "taskArn": "arn:aws:ecs:task/1",
                "clusterName": "vault-cluster",
                "hostedZoneId": "Z0EXAMPLE",
                "fqdn": "vault.example.com",
                "apiGatewayDomainName": "d-abc123.execute-api.us-east-1.amazonaws.com",
                "apiGatewayHostedZoneId": "Z1UJRXOUMOOFQ8"
            })
        );
    }
}
