//! Process configuration, read from flags or `NSM_*` environment variables.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::app::AppOptions;
use crate::derive::{AddressDiscovery, Deriver, InterfaceDiscovery, NodePolicy, StaticDiscovery};
use crate::error::ConfigError;
use crate::reconcile::ReconcileSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Writes a map of internal to external node IPs.
#[derive(Debug, Clone, Parser)]
#[command(name = "map-ip-k8s")]
#[command(version)]
pub struct Config {
    /// Path to write the map of internal to external IPs to.
    #[arg(long, env = "NSM_OUTPUT_PATH", default_value = "external_ips.yaml")]
    pub output_path: PathBuf,

    /// Name of the node this process runs on.
    #[arg(long, env = "NSM_NODE_NAME")]
    pub node_name: Option<String>,

    /// Config map holding static translations.
    #[arg(long, env = "NSM_FROM_CONFIG_MAP")]
    pub from_config_map: Option<String>,

    /// Namespace of the config map.
    #[arg(long, env = "NSM_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Public IP of this process; discovered from local interfaces when unset.
    #[arg(long, env = "NSM_PUBLIC_IP")]
    pub public_ip: Option<String>,

    /// Wait between failed subscribe attempts, in milliseconds.
    #[arg(long, env = "NSM_RECONNECT_BACKOFF_MS", default_value_t = 1000)]
    pub reconnect_backoff_ms: u64,

    /// Consecutive failed subscribe attempts tolerated before exiting.
    #[arg(long, env = "NSM_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Do not map external addresses back to internal ones.
    #[arg(long, env = "NSM_DISABLE_REVERSE")]
    pub disable_reverse: bool,

    #[arg(long, env = "NSM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "NSM_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                message: "output path must not be empty".to_string(),
            });
        }

        if self.reconnect_backoff_ms == 0 {
            return Err(ConfigError::Validation {
                message: "reconnect backoff must be greater than zero".to_string(),
            });
        }

        if self.config_map_name().is_some() && self.namespace.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "namespace is required when a config map is set".to_string(),
            });
        }

        Ok(())
    }

    /// The config map to watch, if any.
    pub fn config_map_name(&self) -> Option<&str> {
        self.from_config_map
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn node_policy(&self) -> NodePolicy {
        NodePolicy {
            emit_reverse: !self.disable_reverse,
        }
    }

    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            backoff: Duration::from_millis(self.reconnect_backoff_ms),
            max_retries: self.max_retries,
        }
    }

    pub fn discovery(&self) -> Arc<dyn AddressDiscovery> {
        match self.public_ip.as_deref().filter(|ip| !ip.is_empty()) {
            Some(ip) => Arc::new(StaticDiscovery::new(ip)),
            None => Arc::new(InterfaceDiscovery),
        }
    }

    pub fn deriver(&self) -> Deriver {
        Deriver::new(self.node_policy(), self.discovery()).with_node_name(self.node_name.clone())
    }

    pub fn app_options(&self) -> AppOptions {
        AppOptions {
            output_path: self.output_path.clone(),
            deriver: self.deriver(),
            reconcile: self.reconcile_settings(),
        }
    }
}
