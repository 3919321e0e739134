//! Service configuration.
//!
//! Two entry points: [`load_cfg`] parses a YAML file (environment variables
//! expanded in-place, so secrets can live outside the file), and
//! [`ServiceConfig::from_env`] builds the same structure from the
//! environment alone for container deployments. Missing environment
//! variables are collected and reported together, not one at a time.

use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid value for {name}: {value:?} ({details})")]
    Invalid {
        name: &'static str,
        value: String,
        details: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub listen: ListenCfg,
    pub kafka: KafkaCfg,
    pub catalog: CatalogCfg,
    #[serde(default)]
    pub modifier_store: ModifierStoreCfg,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenCfg {
    pub addr: String,
    pub port: u16,
}

impl ListenCfg {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaCfg {
    /// bootstrap.servers
    pub servers: String,

    /// Topic inbound events are queued on.
    pub topic: String,

    /// Consumer group whose offsets the replay surface controls.
    pub group_id: String,

    /// Raw librdkafka overrides applied last.
    #[serde(default)]
    pub client_conf: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCfg {
    /// Base URI of the catalog service.
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierStoreCfg {
    pub path: String,
}

impl Default for ModifierStoreCfg {
    fn default() -> Self {
        Self {
            path: "fluxgate-modifiers.db".to_string(),
        }
    }
}

pub fn load_cfg(path: &str) -> Result<ServiceConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {path}"))?;
    let with_env = shellexpand::env(&raw)
        .with_context(|| "expanding environment variables")?
        .to_string();
    let cfg: ServiceConfig =
        serde_yaml::from_str(&with_env).with_context(|| "parsing yaml")?;
    Ok(cfg)
}

impl ServiceConfig {
    /// Build a configuration from process environment variables.
    pub fn from_env() -> Result<Self, EnvError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Environment construction with an injectable lookup, so tests do not
    /// mutate process-global state.
    ///
    /// `KAFKA_TOPIC` falls back to `SERVICE_KAFKA_TOPIC`; `MODIFIER_DB` is
    /// optional and defaults to a file in the working directory.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn require(
            missing: &mut Vec<String>,
            name: &str,
            value: Option<String>,
        ) -> String {
            match value {
                Some(v) => v,
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        }

        let mut missing = Vec::new();
        let servers =
            require(&mut missing, "KAFKA_SERVERS", lookup("KAFKA_SERVERS"));
        let topic = require(
            &mut missing,
            "KAFKA_TOPIC",
            lookup("KAFKA_TOPIC").or_else(|| lookup("SERVICE_KAFKA_TOPIC")),
        );
        let group_id =
            require(&mut missing, "KAFKA_GROUP_ID", lookup("KAFKA_GROUP_ID"));
        let addr = require(&mut missing, "LISTEN_ADDR", lookup("LISTEN_ADDR"));
        let port_raw =
            require(&mut missing, "LISTEN_PORT", lookup("LISTEN_PORT"));
        let catalog_uri =
            require(&mut missing, "CATALOG_URI", lookup("CATALOG_URI"));

        if !missing.is_empty() {
            return Err(EnvError::Missing(missing));
        }

        let port = port_raw.parse::<u16>().map_err(|e| EnvError::Invalid {
            name: "LISTEN_PORT",
            value: port_raw.clone(),
            details: e.to_string(),
        })?;

        Ok(Self {
            listen: ListenCfg { addr, port },
            kafka: KafkaCfg {
                servers,
                topic,
                group_id,
                client_conf: HashMap::new(),
            },
            catalog: CatalogCfg { uri: catalog_uri },
            modifier_store: lookup("MODIFIER_DB")
                .map(|path| ModifierStoreCfg { path })
                .unwrap_or_default(),
        })
    }
}
