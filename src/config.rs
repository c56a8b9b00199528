//! Connector configuration, resolved once at start-up.
//!
//! Values come from `ARM_CONNECTOR_*` environment variables; when
//! `ARM_CONNECTOR_CONFIG` names a YAML file, its non-secret fields override
//! them. The client secret is only ever read from the environment.

use std::fs;
use std::net::SocketAddr;
use std::str::FromStr;

use armc_azure::types::{ArmConfig, ArmCredentials};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_SUBSCRIPTION_ID: &str = "ARM_CONNECTOR_SUBSCRIPTION_ID";
pub const ENV_TENANT_ID: &str = "ARM_CONNECTOR_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "ARM_CONNECTOR_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ARM_CONNECTOR_CLIENT_SECRET";
pub const ENV_BIND: &str = "ARM_CONNECTOR_BIND";
pub const ENV_ARM_BASE: &str = "ARM_CONNECTOR_ARM_BASE";
pub const ENV_LOGIN_BASE: &str = "ARM_CONNECTOR_LOGIN_BASE";
pub const ENV_TIMEOUT_SECS: &str = "ARM_CONNECTOR_TIMEOUT_SECS";
pub const ENV_LOG_FORMAT: &str = "ARM_CONNECTOR_LOG_FORMAT";
pub const ENV_CONFIG: &str = "ARM_CONNECTOR_CONFIG";

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var}: {message}")]
    Invalid { var: &'static str, message: String },
    #[error("config file {path}: {message}")]
    File { path: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug)]
pub struct ConnectorConfig {
    pub bind: SocketAddr,
    pub log_format: LogFormat,
    pub arm: ArmConfig,
    pub credentials: ArmCredentials,
}

/// Non-secret fields a YAML file may override.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConnectorConfigOverride {
    bind: Option<String>,
    log_format: Option<String>,
    subscription_id: Option<String>,
    tenant_id: Option<String>,
    client_id: Option<String>,
    arm_base: Option<String>,
    login_base: Option<String>,
    timeout_secs: Option<u64>,
    api_version_resources: Option<String>,
    api_version_events: Option<String>,
    api_version_metrics: Option<String>,
}

impl ConnectorConfig {
    /// Environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Environment, then the YAML overlay named by `ARM_CONNECTOR_CONFIG`.
    pub fn from_env_or_yaml() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        match lookup(ENV_CONFIG).filter(|p| !p.is_empty()) {
            Some(path) => {
                let contents = fs::read_to_string(&path).map_err(|e| ConfigError::File {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                Self::from_lookup_and_yaml(lookup, &contents).map_err(|e| match e {
                    ConfigError::File { message, .. } => ConfigError::File { path, message },
                    other => other,
                })
            }
            None => Self::from_lookup(lookup),
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::resolve(lookup, ConnectorConfigOverride::default())
    }

    pub fn from_lookup_and_yaml<F>(lookup: F, yaml: &str) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let overlay: ConnectorConfigOverride =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::File {
                path: String::new(),
                message: e.to_string(),
            })?;
        Self::resolve(lookup, overlay)
    }

    fn resolve<F>(lookup: F, overlay: ConnectorConfigOverride) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_text = overlay
            .bind
            .or_else(|| var(ENV_BIND))
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_text.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            var: ENV_BIND,
            message: format!("'{bind_text}': {e}"),
        })?;

        let log_format = match overlay.log_format.or_else(|| var(ENV_LOG_FORMAT)) {
            Some(text) => text.parse::<LogFormat>().map_err(|message| ConfigError::Invalid {
                var: ENV_LOG_FORMAT,
                message,
            })?,
            None if cfg!(feature = "logs-json") => LogFormat::Json,
            None => LogFormat::Text,
        };

        let mut arm = ArmConfig::new();
        if let Some(base) = overlay.arm_base.or_else(|| var(ENV_ARM_BASE)) {
            arm.arm_base = base;
        }
        if let Some(base) = overlay.login_base.or_else(|| var(ENV_LOGIN_BASE)) {
            arm.login_base = base;
        }
        let timeout = match overlay.timeout_secs {
            Some(secs) => Some(secs),
            None => var(ENV_TIMEOUT_SECS)
                .map(|t| {
                    t.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                        var: ENV_TIMEOUT_SECS,
                        message: format!("'{t}': {e}"),
                    })
                })
                .transpose()?,
        };
        if let Some(secs) = timeout {
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var: ENV_TIMEOUT_SECS,
                    message: "must be at least 1 second".into(),
                });
            }
            arm.request_timeout_secs = secs;
        }
        if let Some(v) = overlay.api_version_resources {
            arm.api_version_resources = v;
        }
        if let Some(v) = overlay.api_version_events {
            arm.api_version_events = v;
        }
        if let Some(v) = overlay.api_version_metrics {
            arm.api_version_metrics = v;
        }

        let required = |key: &'static str, over: Option<String>| {
            over.or_else(|| var(key)).ok_or(ConfigError::Missing(key))
        };
        let subscription_id = required(ENV_SUBSCRIPTION_ID, overlay.subscription_id)?;
        let tenant_id = required(ENV_TENANT_ID, overlay.tenant_id)?;
        let client_id = required(ENV_CLIENT_ID, overlay.client_id)?;
        let client_secret = required(ENV_CLIENT_SECRET, None)?;

        Ok(Self {
            bind,
            log_format,
            arm,
            credentials: ArmCredentials::new(tenant_id, client_id, client_secret, subscription_id),
        })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_SUBSCRIPTION_ID, "sub-1"),
            (ENV_TENANT_ID, "tenant-1"),
            (ENV_CLIENT_ID, "client-1"),
            (ENV_CLIENT_SECRET, "s3cret"),
        ]
    }

    #[test]
    fn defaults_apply() {
        let cfg = ConnectorConfig::from_lookup(env(&required())).unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.arm.arm_base, "https://management.azure.com");
        assert_eq!(cfg.arm.request_timeout_secs, 30);
        assert_eq!(cfg.credentials.subscription_id, "sub-1");
        assert_eq!(cfg.credentials.client_secret.expose_secret(), "s3cret");
    }

    #[test]
    fn missing_required_variable_is_named() {
        let mut vars = required();
        vars.retain(|(k, _)| *k != ENV_TENANT_ID);
        let err = ConnectorConfig::from_lookup(env(&vars)).unwrap_err();
        assert_eq!(err.to_string(), "ARM_CONNECTOR_TENANT_ID must be set");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut vars = required();
        vars.push((ENV_BIND, "not-an-addr"));
        assert!(matches!(
            ConnectorConfig::from_lookup(env(&vars)),
            Err(ConfigError::Invalid { var: ENV_BIND, .. })
        ));

        let mut vars = required();
        vars.push((ENV_TIMEOUT_SECS, "soon"));
        assert!(matches!(
            ConnectorConfig::from_lookup(env(&vars)),
            Err(ConfigError::Invalid { var: ENV_TIMEOUT_SECS, .. })
        ));
    }

    #[test]
    fn environment_overrides() {
        let mut vars = required();
        vars.extend([
            (ENV_BIND, "127.0.0.1:9999"),
            (ENV_ARM_BASE, "http://127.0.0.1:7000"),
            (ENV_TIMEOUT_SECS, "5"),
            (ENV_LOG_FORMAT, "json"),
        ]);
        let cfg = ConnectorConfig::from_lookup(env(&vars)).unwrap();
        assert_eq!(cfg.bind.port(), 9999);
        assert_eq!(cfg.arm.arm_base, "http://127.0.0.1:7000");
        assert_eq!(cfg.arm.request_timeout_secs, 5);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn yaml_overlay_wins_over_environment() {
        let yaml = "bind: 127.0.0.1:7001\ntimeout_secs: 12\napi_version_events: 2017-03-01-preview\n";
        let mut vars = required();
        vars.push((ENV_BIND, "127.0.0.1:9999"));
        let cfg = ConnectorConfig::from_lookup_and_yaml(env(&vars), yaml).unwrap();
        assert_eq!(cfg.bind.port(), 7001);
        assert_eq!(cfg.arm.request_timeout_secs, 12);
        assert_eq!(cfg.arm.api_version_events, "2017-03-01-preview");
    }

    #[test]
    fn yaml_cannot_carry_the_secret() {
        let yaml = "client_secret: nope\n";
        let err = ConnectorConfig::from_lookup_and_yaml(env(&required()), yaml).unwrap_err();
        assert!(matches!(err, ConfigError::File { .. }));
    }

    #[test]
    #[serial]
    fn from_env_or_yaml_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind: 127.0.0.1:7002").unwrap();
        writeln!(file, "subscription_id: sub-from-file").unwrap();

        let mut vars = required();
        vars.push((ENV_CONFIG, file.path().to_str().unwrap()));
        for (k, v) in &vars {
            std::env::set_var(k, v);
        }
        let cfg = ConnectorConfig::from_env_or_yaml();
        for (k, _) in &vars {
            std::env::remove_var(k);
        }

        let cfg = cfg.unwrap();
        assert_eq!(cfg.bind.port(), 7002);
        assert_eq!(cfg.credentials.subscription_id, "sub-from-file");
    }

    #[test]
    #[serial]
    fn from_env_or_yaml_reports_missing_file() {
        let mut vars = required();
        vars.push((ENV_CONFIG, "/definitely/not/here.yaml"));
        for (k, v) in &vars {
            std::env::set_var(k, v);
        }
        let cfg = ConnectorConfig::from_env_or_yaml();
        for (k, _) in &vars {
            std::env::remove_var(k);
        }
        assert!(matches!(cfg, Err(ConfigError::File { path, .. }) if path == "/definitely/not/here.yaml"));
    }
}
