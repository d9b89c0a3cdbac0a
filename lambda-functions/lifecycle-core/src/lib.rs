//! Shared pieces of the vault container lifecycle functions.
//!
//! The start, stop and cleanup Lambdas all talk to the same three managed
//! services (ECS, Route 53 and Step Functions). This crate owns the seams to
//! those services, their AWS SDK adapters, the configuration read at cold
//! start and the response envelopes returned to callers.

pub mod config;
pub mod dns;
pub mod ecs;
pub mod error;
pub mod response;
pub mod workflow;

pub use config::{ConfigError, StartConfig, StopConfig};
pub use dns::{
    AliasTarget, DnsRecord, DnsZone, RecordAction, RecordChange, Route53Zone, RoutingPolicy,
};
pub use ecs::{DesiredStatus, EcsTaskRunner, LaunchRequest, TaskRunner, TaskSnapshot, TaskStatus};
pub use error::ApiError;
pub use response::{ErrorBody, Response, StepOutcome};
pub use workflow::{ShutdownWorkflowInput, StepFunctionsEngine, WorkflowEngine};

#[cfg(any(test, feature = "mocks"))]
pub use dns::MockDnsZone;
#[cfg(any(test, feature = "mocks"))]
pub use ecs::MockTaskRunner;
#[cfg(any(test, feature = "mocks"))]
pub use workflow::MockWorkflowEngine;

use aws_config::BehaviorVersion;

/// Loads the shared AWS configuration from the Lambda execution environment.
pub async fn load_aws_config() -> aws_config::SdkConfig {
    aws_config::defaults(BehaviorVersion::latest()).load().await
}
