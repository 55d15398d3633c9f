use std::{env, fmt::Debug, net::SocketAddr};

use anyhow::Result;
use blob_store::{DiskStorageConfig, S3Config};
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub state_store_path: String,
    pub local_storage: DiskStorageConfig,
    pub s3: S3Config,
    /// Bearer tokens accepted on the blob routes. Empty disables auth.
    pub api_tokens: Vec<String>,
    pub structured_logging: bool,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let state_store_path = env::current_dir()
            .unwrap_or_default()
            .join("blobgate_storage/state");
        ServerConfig {
            listen_addr: "0.0.0.0:8900".to_string(),
            state_store_path: state_store_path.display().to_string(),
            local_storage: Default::default(),
            s3: Default::default(),
            api_tokens: Vec::new(),
            structured_logging: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn from_path(path: &str) -> Result<ServerConfig> {
        let config_str = std::fs::read_to_string(path)?;
        Self::from_yaml(&config_str)
    }

    /// Parse a YAML document. `BLOBGATE_` prefixed environment variables
    /// override it, e.g. `BLOBGATE_LISTEN_ADDR`.
    pub fn from_yaml(config_str: &str) -> Result<ServerConfig> {
        let config: ServerConfig = Figment::new()
            .merge(Yaml::string(config_str))
            .merge(Env::prefixed("BLOBGATE_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(anyhow::anyhow!(
                "invalid listen address: {}",
                self.listen_addr
            ));
        }
        if self.state_store_path.trim().is_empty() {
            return Err(anyhow::anyhow!("state_store_path must not be empty"));
        }
        if self.max_body_bytes == 0 {
            return Err(anyhow::anyhow!("max_body_bytes must be positive"));
        }
        if self.api_tokens.iter().any(|token| token.trim().is_empty()) {
            return Err(anyhow::anyhow!("api_tokens must not contain empty tokens"));
        }
        self.s3.validate()?;
        Ok(())
    }
}
