//! Node configuration, read from a TOML file.
//!
//! ```toml
//! [store]
//! backend = "sqlite"      # or "txt"
//! path = "idec.db"        # database file or base directory
//!
//! [server]
//! listen = "0.0.0.0:62220"
//!
//! [[echoareas]]
//! name = "ii.test.14"
//! description = "test area"
//!
//! [uplink]
//! url = "http://idec.example.org/"
//! echoareas = ["ii.test.14"]
//! auth = "4p4KGQnD"
//! timeout_secs = 30
//!
//! [sync]
//! bundle_batch_size = 40
//! honor_remote_blacklist = true
//! ```
//!
//! Every section and field is optional.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use idec_core::validate_echoarea;
use idec_store::Backend;
use idec_sync::SyncConfig;

use crate::error::{NodeError, Result};

/// Top-level node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub store: StoreConfig,
    pub server: ServerConfig,
    /// Echoareas advertised in `list.txt`. Empty means "whatever holds messages".
    pub echoareas: Vec<EchoareaConfig>,
    /// Upstream node this node pulls from, if any.
    pub uplink: Option<UplinkConfig>,
    pub sync: SyncSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            path: PathBuf::from("idec.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP surface binds to.
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:62220".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoareaConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    /// Base URL of the uplink's HTTP surface.
    pub url: Option<String>,
    /// Echoareas to subscribe to.
    pub echoareas: Vec<String>,
    /// Authstr of this node's point on the uplink, for sending.
    pub auth: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            url: None,
            echoareas: Vec::new(),
            auth: None,
            timeout_secs: crate::uplink::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl UplinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub bundle_batch_size: usize,
    pub honor_remote_blacklist: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let defaults = SyncConfig::default();
        Self {
            bundle_batch_size: defaults.bundle_batch_size,
            honor_remote_blacklist: defaults.honor_remote_blacklist,
        }
    }
}

impl From<&SyncSettings> for SyncConfig {
    fn from(settings: &SyncSettings) -> Self {
        SyncConfig {
            bundle_batch_size: settings.bundle_batch_size,
            honor_remote_blacklist: settings.honor_remote_blacklist,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.sync.bundle_batch_size == 0 {
            return Err(NodeError::Config(
                "bundle_batch_size must be greater than 0".to_string(),
            ));
        }

        self.listen_addr()?;

        for echoarea in &self.echoareas {
            check_echoarea(&echoarea.name)?;
        }
        if let Some(uplink) = &self.uplink {
            for echoarea in &uplink.echoareas {
                check_echoarea(echoarea)?;
            }
            if let Some(url) = &uplink.url {
                crate::uplink::parse_base(url)?;
            }
            if uplink.timeout_secs == 0 {
                return Err(NodeError::Config(
                    "uplink timeout_secs must be greater than 0".to_string(),
                ));
            }
        }

        // Same grammar RUST_LOG accepts, e.g. "idec_node=debug,info".
        EnvFilter::try_new(&self.logging.level).map_err(|e| {
            NodeError::Config(format!("invalid log filter {}: {}", self.logging.level, e))
        })?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen
            .parse()
            .map_err(|e| NodeError::Config(format!("invalid listen address: {}", e)))
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::from(&self.sync)
    }

    /// Advertised echoareas as (name, description) pairs.
    pub fn advertised(&self) -> Vec<(String, String)> {
        self.echoareas
            .iter()
            .map(|e| (e.name.clone(), e.description.clone()))
            .collect()
    }
}

fn check_echoarea(name: &str) -> Result<()> {
    validate_echoarea(name).map_err(|e| NodeError::Config(e.to_string()))
}
