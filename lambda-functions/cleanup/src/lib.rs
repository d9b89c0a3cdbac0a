use lifecycle_core::dns::remove_alias_record;
use lifecycle_core::{DnsZone, StepOutcome};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Final state of the auto-shutdown workflow; receives the workflow input.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub task_arn: Option<String>,
    pub hosted_zone_id: Option<String>,
    pub fqdn: Option<String>,
    pub api_gateway_domain_name: Option<String>,
    pub api_gateway_hosted_zone_id: Option<String>,
}

impl Request {
    /// Zone and name, when both are present and non-empty.
    pub fn target(&self) -> Option<(&str, &str)> {
        let zone = self.hosted_zone_id.as_deref().filter(|v| !v.is_empty())?;
        let fqdn = self.fqdn.as_deref().filter(|v| !v.is_empty())?;
        Some((zone, fqdn))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub message: String,
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            message: message.into(),
        }
    }
}

pub struct CleanupService<D> {
    dns: D,
}

impl<D: DnsZone> CleanupService<D> {
    pub fn new(dns: D) -> Self {
        Self { dns }
    }

    /// Nothing can be done after this step, so it always reports success.
    pub async fn handle(&self, request: &Request) -> Response {
        let Some((zone_id, fqdn)) = request.target() else {
            info!("Missing required parameters, skipping cleanup");
            return Response::success("Cleanup skipped - missing parameters");
        };

        info!(
            fqdn,
            task_arn = request.task_arn.as_deref().unwrap_or_default(),
            api_gateway_domain = request.api_gateway_domain_name.as_deref().unwrap_or_default(),
            api_gateway_zone_id = request
                .api_gateway_hosted_zone_id
                .as_deref()
                .unwrap_or_default(),
            "Cleaning up resources"
        );

        match remove_alias_record(&self.dns, zone_id, fqdn).await {
            StepOutcome::Warning(warning) => {
                Response::success(format!("Cleanup completed with warnings: {warning}"))
            }
            StepOutcome::Completed(_) | StepOutcome::Skipped(_) => {
                Response::success("Cleanup completed successfully")
            }
        }
    }
}
