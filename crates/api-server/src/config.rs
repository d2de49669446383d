//! Server configuration read from the environment

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use agent_runner::{OrchestratorConfig, PlannerConfig, DEFAULT_MAX_ATTEMPTS};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Planner connection settings
#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub assistant_id: Option<String>,
    pub poll_interval: Duration,
    pub run_timeout: Option<Duration>,
    pub max_polls: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub planner: PlannerSettings,
    pub max_attempts: u32,
    pub agent_name: String,
    pub auto_publish: bool,
    pub auto_default_topic: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw = var("BP_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8081".to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "BP_BIND_ADDR",
                value: bind_raw.clone(),
            })?;

        let poll_interval_ms: u64 = parse_var(&var, "PLANNER_POLL_INTERVAL_MS")?.unwrap_or(1000);
        let run_timeout_secs: Option<u64> = parse_var(&var, "PLANNER_RUN_TIMEOUT_SECS")?;

        Ok(Self {
            data_dir: var("BP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".bp-data")),
            bind_addr,
            planner: PlannerSettings {
                base_url: var("PLANNER_BASE_URL")
                    .unwrap_or_else(|| PlannerConfig::default().base_url),
                api_key: var("PLANNER_API_KEY"),
                assistant_id: var("PLANNER_ASSISTANT_ID"),
                poll_interval: Duration::from_millis(poll_interval_ms),
                run_timeout: run_timeout_secs.map(Duration::from_secs),
                max_polls: parse_var(&var, "PLANNER_MAX_POLLS")?,
            },
            max_attempts: parse_var(&var, "TOOL_MAX_ATTEMPTS")?.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            agent_name: var("AGENT_NAME").unwrap_or_else(|| "content-planner".to_string()),
            auto_publish: flag(var("FEATURE_AUTO_PUBLISH"), true),
            auto_default_topic: flag(var("FEATURE_AUTO_DEFAULT_TOPIC"), true),
        })
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            agent_name: self.agent_name.clone(),
            poll_interval: self.planner.poll_interval,
            run_timeout: self.planner.run_timeout,
            max_polls: self.planner.max_polls,
            max_attempts: self.max_attempts,
            auto_publish: self.auto_publish,
            auto_default_topic: self.auto_default_topic,
            ..OrchestratorConfig::default()
        }
    }

    pub fn planner_config(&self, tools: Vec<Value>) -> PlannerConfig {
        PlannerConfig {
            base_url: self.planner.base_url.clone(),
            api_key: self.planner.api_key.clone().unwrap_or_default(),
            assistant_id: self.planner.assistant_id.clone().unwrap_or_default(),
            tools,
            ..PlannerConfig::default()
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(None),
    }
}

fn flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(".bp-data"));
        assert_eq!(config.bind_addr.port(), 8081);
        assert_eq!(config.planner.poll_interval, Duration::from_millis(1000));
        assert!(config.planner.run_timeout.is_none());
        assert!(config.planner.max_polls.is_none());
        assert!(config.planner.api_key.is_none());
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.agent_name, "content-planner");
        assert!(config.auto_publish);
        assert!(config.auto_default_topic);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("BP_DATA_DIR", "/tmp/bp"),
            ("BP_BIND_ADDR", "127.0.0.1:9000"),
            ("PLANNER_API_KEY", "sk-test"),
            ("PLANNER_RUN_TIMEOUT_SECS", "90"),
            ("PLANNER_MAX_POLLS", "120"),
            ("TOOL_MAX_ATTEMPTS", "5"),
            ("FEATURE_AUTO_PUBLISH", "off"),
            ("FEATURE_AUTO_DEFAULT_TOPIC", "maybe"),
        ])
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/bp"));
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.planner.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.planner.run_timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.planner.max_polls, Some(120));
        assert!(!config.auto_publish);
        assert!(config.auto_default_topic);

        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.max_attempts, 5);
        assert_eq!(orchestrator.result_field, "postCopy");
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = config_from(&[("PLANNER_MAX_POLLS", "many")]).unwrap_err();
        assert!(err.to_string().contains("PLANNER_MAX_POLLS"));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config_from(&[("AGENT_NAME", "  "), ("PLANNER_API_KEY", "")]).unwrap();
        assert_eq!(config.agent_name, "content-planner");
        assert!(config.planner.api_key.is_none());
    }
}
