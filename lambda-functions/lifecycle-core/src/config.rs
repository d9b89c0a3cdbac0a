//! Configuration read once at cold start.
//!
//! Each function gets its own struct so that a function only requires the
//! environment variables it actually uses. Loading goes through a lookup
//! closure; `from_env` is the process-environment flavour.

use bon::Builder;
use thiserror::Error;

pub const DEFAULT_AUTO_SHUTDOWN_MINUTES: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Settings for the start-container function.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(on(String, into))]
pub struct StartConfig {
    pub cluster_name: String,
    pub task_definition: String,
    pub subnet_ids: Vec<String>,
    pub security_group_id: String,
    pub container_name: String,
    pub state_machine_arn: String,
    /// Regional domain name of the API Gateway custom domain fronting the task.
    pub entry_point_domain_name: String,
    /// Route 53 zone id that API Gateway publishes its regional domains in.
    pub entry_point_hosted_zone_id: String,
    pub hosted_zone_id: String,
    pub fqdn: String,
    /// Shown to callers only. The shutdown workflow owns the real timer.
    #[builder(default = DEFAULT_AUTO_SHUTDOWN_MINUTES)]
    pub auto_shutdown_minutes: u32,
}

impl StartConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auto_shutdown_minutes = match optional(&lookup, "AUTO_SHUTDOWN_MINUTES") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                var: "AUTO_SHUTDOWN_MINUTES",
                reason: format!("{raw:?}: {e}"),
            })?,
            None => DEFAULT_AUTO_SHUTDOWN_MINUTES,
        };

        Ok(Self {
            cluster_name: required(&lookup, "CLUSTER_NAME")?,
            task_definition: required(&lookup, "TASK_DEFINITION")?,
            subnet_ids: parse_subnets(&required(&lookup, "SUBNET_IDS")?)?,
            security_group_id: required(&lookup, "CONTAINER_SECURITY_GROUP_ID")?,
            container_name: required(&lookup, "CONTAINER_NAME")?,
            state_machine_arn: required(&lookup, "STATE_MACHINE_ARN")?,
            entry_point_domain_name: required(&lookup, "API_GATEWAY_DOMAIN_NAME")?,
            entry_point_hosted_zone_id: required(&lookup, "API_GATEWAY_HOSTED_ZONE_ID")?,
            hosted_zone_id: required(&lookup, "HOSTED_ZONE_ID")?,
            fqdn: required(&lookup, "FQDN")?,
            auto_shutdown_minutes,
        })
    }

    pub fn public_url(&self) -> String {
        format!("https://{}", self.fqdn)
    }
}

/// Settings for the stop-container function.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(on(String, into))]
pub struct StopConfig {
    pub cluster_name: String,
    pub hosted_zone_id: String,
    pub fqdn: String,
}

impl StopConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            cluster_name: required(&lookup, "CLUSTER_NAME")?,
            hosted_zone_id: required(&lookup, "HOSTED_ZONE_ID")?,
            fqdn: required(&lookup, "FQDN")?,
        })
    }
}

fn optional<F>(lookup: &F, var: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, var).ok_or(ConfigError::Missing(var))
}

fn parse_subnets(raw: &str) -> Result<Vec<String>, ConfigError> {
    let subnets: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if subnets.is_empty() {
        return Err(ConfigError::Invalid {
            var: "SUBNET_IDS",
            reason: "no subnet ids given".to_string(),
        });
    }
    Ok(subnets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn start_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("CLUSTER_NAME", "vault-cluster".to_string()),
            ("TASK_DEFINITION", "vault-task:3".to_string()),
            ("SUBNET_IDS", "subnet-a, subnet-b,".to_string()),
            ("CONTAINER_SECURITY_GROUP_ID", "sg-123".to_string()),
            ("CONTAINER_NAME", "vault".to_string()),
            (
                "STATE_MACHINE_ARN",
                "arn:aws:states:us-east-1:123456789012:stateMachine:vault-shutdown".to_string(),
            ),
            (
                "API_GATEWAY_DOMAIN_NAME",
                "d-abc123.execute-api.us-east-1.amazonaws.com".to_string(),
            ),
            ("API_GATEWAY_HOSTED_ZONE_ID", "Z1UJRXOUMOOFQ8".to_string()),
            ("HOSTED_ZONE_ID", "Z0EXAMPLE".to_string()),
            ("FQDN", "vault.example.com".to_string()),
        ])
    }

    #[test]
    fn test_start_config_from_lookup() {
        let env = start_env();
        let config = StartConfig::from_lookup(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.cluster_name, "vault-cluster");
        assert_eq!(config.subnet_ids, vec!["subnet-a", "subnet-b"]);
        assert_eq!(config.auto_shutdown_minutes, DEFAULT_AUTO_SHUTDOWN_MINUTES);
        assert_eq!(config.public_url(), "https://vault.example.com");
    }

    #[test]
    fn test_start_config_missing_variable() {
        let mut env = start_env();
        env.remove("STATE_MACHINE_ARN");

        let err = StartConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::Missing("STATE_MACHINE_ARN"));
        assert_eq!(err.to_string(), "STATE_MACHINE_ARN is required");
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut env = start_env();
        env.insert("FQDN", "   ".to_string());

        let err = StartConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::Missing("FQDN"));
    }

    #[test]
    fn test_auto_shutdown_minutes_override() {
        let mut env = start_env();
        env.insert("AUTO_SHUTDOWN_MINUTES", "45".to_string());

        let config = StartConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.auto_shutdown_minutes, 45);
    }

    #[test]
    fn test_auto_shutdown_minutes_invalid() {
        let mut env = start_env();
        env.insert("AUTO_SHUTDOWN_MINUTES", "half an hour".to_string());

        let err = StartConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "AUTO_SHUTDOWN_MINUTES",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_subnet_list_rejected() {
        let mut env = start_env();
        env.insert("SUBNET_IDS", " , ,".to_string());

        let err = StartConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SUBNET_IDS", .. }));
    }

    #[test]
    fn test_stop_config_needs_only_its_own_variables() {
        let env = HashMap::from([
            ("CLUSTER_NAME", "vault-cluster".to_string()),
            ("HOSTED_ZONE_ID", "Z0EXAMPLE".to_string()),
            ("FQDN", "vault.example.com".to_string()),
        ]);

        let config = StopConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(
            config,
            StopConfig::builder()
                .cluster_name("vault-cluster")
                .hosted_zone_id("Z0EXAMPLE")
                .fqdn("vault.example.com")
                .build()
        );
    }
}
