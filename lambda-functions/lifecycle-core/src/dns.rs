//! Route 53 alias record handling shared by every function.
//!
//! Start upserts an `A` alias pointing the vault name at the API Gateway
//! custom domain. Stop and cleanup remove it again, but only when the record
//! in the zone is still that alias.

use async_trait::async_trait;
use aws_sdk_route53::types::{
    AliasTarget as Route53AliasTarget, Change, ChangeAction, ChangeBatch, ResourceRecordSet,
    ResourceRecordSetFailover, ResourceRecordSetRegion, RrType,
};
use aws_sdk_route53::Client as Route53Client;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::response::StepOutcome;

pub const ALIAS_RECORD_TYPE: &str = "A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget {
    pub hosted_zone_id: String,
    pub dns_name: String,
    pub evaluate_target_health: bool,
}

/// Routing-policy fields of a record set. Route 53 only deletes a record
/// whose values match the stored set exactly, so these travel with the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingPolicy {
    pub set_identifier: Option<String>,
    pub weight: Option<i64>,
    pub region: Option<String>,
    pub failover: Option<String>,
    pub multi_value_answer: Option<bool>,
    pub health_check_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: String,
    pub record_type: String,
    pub alias_target: Option<AliasTarget>,
    pub routing: RoutingPolicy,
}

impl DnsRecord {
    /// An `A` alias record for `fqdn` that resolves through the entry point.
    pub fn alias(fqdn: &str, target_domain: &str, target_zone_id: &str) -> Self {
        Self {
            name: fqdn.to_string(),
            record_type: ALIAS_RECORD_TYPE.to_string(),
            alias_target: Some(AliasTarget {
                hosted_zone_id: target_zone_id.to_string(),
                dns_name: target_domain.to_string(),
                evaluate_target_health: false,
            }),
            routing: RoutingPolicy::default(),
        }
    }

    /// True when this is the alias record published for `fqdn`.
    pub fn is_alias_for(&self, fqdn: &str) -> bool {
        normalize_name(&self.name) == normalize_name(fqdn)
            && self.record_type == ALIAS_RECORD_TYPE
            && self.alias_target.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    Upsert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChange {
    pub action: RecordAction,
    pub record: DnsRecord,
}

/// The DNS zone service.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait DnsZone: Send + Sync {
    /// Records in `zone_id` in lexicographic order starting at
    /// `start_name`/`record_type`, at most `max_items` of them.
    async fn list_records(
        &self,
        zone_id: &str,
        start_name: &str,
        record_type: &str,
        max_items: i32,
    ) -> Result<Vec<DnsRecord>, ApiError>;

    async fn change_record(&self, zone_id: &str, change: &RecordChange) -> Result<(), ApiError>;
}

/// Zone names come back fully qualified ("vault.example.com.").
pub fn normalize_name(name: &str) -> &str {
    name.trim_end_matches('.')
}

/// Points `record` at the entry point. A failure is downgraded to a warning.
pub async fn publish_alias<D>(dns: &D, zone_id: &str, record: DnsRecord) -> StepOutcome
where
    D: DnsZone + ?Sized,
{
    info!(name = %record.name, zone_id, "Updating DNS alias record");

    let change = RecordChange {
        action: RecordAction::Upsert,
        record,
    };
    match dns.change_record(zone_id, &change).await {
        Ok(()) => {
            info!("DNS alias record created");
            StepOutcome::Completed(format!("DNS alias record {} updated", change.record.name))
        }
        Err(e) => {
            warn!(error = %e, "Failed to update DNS record");
            StepOutcome::Warning(format!("Failed to update DNS record: {e}"))
        }
    }
}

/// Deletes the alias record for `fqdn` if it is still present. A record that
/// is missing, not an `A` alias, or named differently is left alone.
pub async fn remove_alias_record<D>(dns: &D, zone_id: &str, fqdn: &str) -> StepOutcome
where
    D: DnsZone + ?Sized,
{
    info!(fqdn, zone_id, "Removing DNS record");

    let records = match dns.list_records(zone_id, fqdn, ALIAS_RECORD_TYPE, 1).await {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "Failed to look up DNS record");
            return StepOutcome::Warning(format!("Failed to remove DNS record: {e}"));
        }
    };

    let Some(record) = records.into_iter().next() else {
        info!(fqdn, "No DNS records found");
        return StepOutcome::Skipped(format!("No DNS records found for {fqdn}"));
    };

    if !record.is_alias_for(fqdn) {
        info!(
            fqdn,
            found_name = %record.name,
            found_type = %record.record_type,
            "DNS record not found or not an alias record"
        );
        return StepOutcome::Skipped(format!(
            "DNS record not found or not an alias record for {fqdn}"
        ));
    }

    let change = RecordChange {
        action: RecordAction::Delete,
        record,
    };
    match dns.change_record(zone_id, &change).await {
        Ok(()) => {
            info!(fqdn, "DNS alias record removed");
            StepOutcome::Completed(format!("DNS alias record for {fqdn} removed"))
        }
        Err(e) => {
            warn!(error = %e, "Failed to delete DNS record");
            StepOutcome::Warning(format!("Failed to remove DNS record: {e}"))
        }
    }
}

pub struct Route53Zone {
    client: Route53Client,
}

impl Route53Zone {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Route53Client::new(config),
        }
    }
}

fn to_record_set(record: &DnsRecord) -> Result<ResourceRecordSet, ApiError> {
    let routing = &record.routing;
    let mut builder = ResourceRecordSet::builder()
        .name(&record.name)
        .r#type(RrType::from(record.record_type.as_str()))
        .set_set_identifier(routing.set_identifier.clone())
        .set_weight(routing.weight)
        .set_region(routing.region.as_deref().map(ResourceRecordSetRegion::from))
        .set_failover(routing.failover.as_deref().map(ResourceRecordSetFailover::from))
        .set_multi_value_answer(routing.multi_value_answer)
        .set_health_check_id(routing.health_check_id.clone());

    if let Some(alias) = &record.alias_target {
        let target = Route53AliasTarget::builder()
            .hosted_zone_id(&alias.hosted_zone_id)
            .dns_name(&alias.dns_name)
            .evaluate_target_health(alias.evaluate_target_health)
            .build()
            .map_err(|e| ApiError::from_sdk("route53:ChangeResourceRecordSets", e))?;
        builder = builder.alias_target(target);
    }

    builder
        .build()
        .map_err(|e| ApiError::from_sdk("route53:ChangeResourceRecordSets", e))
}

fn from_record_set(set: &ResourceRecordSet) -> DnsRecord {
    DnsRecord {
        name: set.name().to_string(),
        record_type: set.r#type().as_str().to_string(),
        alias_target: set.alias_target().map(|alias| AliasTarget {
            hosted_zone_id: alias.hosted_zone_id().to_string(),
            dns_name: alias.dns_name().to_string(),
            evaluate_target_health: alias.evaluate_target_health(),
        }),
        routing: RoutingPolicy {
            set_identifier: set.set_identifier().map(str::to_string),
            weight: set.weight(),
            region: set.region().map(|region| region.as_str().to_string()),
            failover: set.failover().map(|failover| failover.as_str().to_string()),
            multi_value_answer: set.multi_value_answer(),
            health_check_id: set.health_check_id().map(str::to_string),
        },
    }
}

#[async_trait]
impl DnsZone for Route53Zone {
    async fn list_records(
        &self,
        zone_id: &str,
        start_name: &str,
        record_type: &str,
        max_items: i32,
    ) -> Result<Vec<DnsRecord>, ApiError> {
        let output = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .start_record_name(start_name)
            .start_record_type(RrType::from(record_type))
            .max_items(max_items)
            .send()
            .await
            .map_err(|e| ApiError::from_sdk("route53:ListResourceRecordSets", e))?;

        Ok(output
            .resource_record_sets()
            .iter()
            .map(from_record_set)
            .collect())
    }

    async fn change_record(&self, zone_id: &str, change: &RecordChange) -> Result<(), ApiError> {
        let action = match change.action {
            RecordAction::Upsert => ChangeAction::Upsert,
            RecordAction::Delete => ChangeAction::Delete,
        };

        let change = Change::builder()
            .action(action)
            .resource_record_set(to_record_set(&change.record)?)
            .build()
            .map_err(|e| ApiError::from_sdk("route53:ChangeResourceRecordSets", e))?;
        let batch = ChangeBatch::builder()
            .changes(change)
            .build()
            .map_err(|e| ApiError::from_sdk("route53:ChangeResourceRecordSets", e))?;

        self.client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| ApiError::from_sdk("route53:ChangeResourceRecordSets", e))?;

        Ok(())
    }
}
