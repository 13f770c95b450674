//! Runtime configuration.
//!
//! Sources, later ones winning:
//!
//! 1. struct defaults
//! 2. an optional `taar-profile.{toml,yaml,json}` file (or an explicit path)
//! 3. `TAAR_PROFILE_*` environment variables, `__` separating nested keys
//! 4. `BIGTABLE_PROJECT_ID`, `BIGTABLE_INSTANCE_ID`, `BIGTABLE_TABLE_ID` and
//!    `BIGTABLE_TIMEOUT_SECS` for the wide-column table
//!
//! ## Example file
//!
//! ```toml
//! backend = "dynamodb"
//! compression_level = 9
//! log_level = "taar_profile=debug,store=debug"
//!
//! [dynamodb]
//! region = "us-west-2"
//! table_name = "taar_addon_data_20180206"
//!
//! [test_client_ids]
//! empty = ["00000000"]
//! ```

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use store::codec::DEFAULT_COMPRESSION_LEVEL;
use store::{BackendConfig, KeyValueConfig, PayloadCodec, WideColumnConfig};

use crate::{ProfileFetcher, TestClientIds};

/// Basename of the optional config file looked up in the working directory.
pub const DEFAULT_CONFIG_NAME: &str = "taar-profile";

const BIGTABLE_KEYS: [&str; 4] = ["project_id", "instance_id", "table_id", "timeout_secs"];

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which backend variant the fetcher builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Bigtable,
    Dynamodb,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default)]
    pub bigtable: WideColumnConfig,

    /// Required when `backend = "dynamodb"`; there are no defaults.
    #[serde(default)]
    pub dynamodb: Option<KeyValueConfig>,

    /// zlib level for written payloads, 0 to 9.
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// `tracing_subscriber::EnvFilter` directive.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub test_client_ids: TestClientIds,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            bigtable: WideColumnConfig::default(),
            dynamodb: None,
            compression_level: default_compression_level(),
            log_level: default_log_level(),
            test_client_ids: TestClientIds::default(),
        }
    }
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load from an explicit file and/or environment map.
    ///
    /// `file = None` looks for the optional default file; `env = None` reads
    /// the process environment.
    pub fn load_from(
        file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigLoadError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let bigtable_env = Config::builder()
            .add_source(Environment::with_prefix("BIGTABLE").source(env.clone()))
            .build()?;

        let mut builder = Config::builder().add_source(file_source).add_source(
            Environment::with_prefix("TAAR_PROFILE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("test_client_ids.populated")
                .with_list_parse_key("test_client_ids.empty")
                .try_parsing(true)
                .source(env),
        );
        for key in BIGTABLE_KEYS {
            if let Ok(value) = bigtable_env.get_string(key) {
                builder = builder.set_override(format!("bigtable.{key}"), value)?;
            }
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.compression_level > 9 {
            return Err(ConfigLoadError::Invalid(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        if self.backend != BackendKind::Dynamodb {
            return Ok(());
        }
        let dynamodb = self
            .dynamodb
            .as_ref()
            .ok_or_else(|| ConfigLoadError::MissingField("dynamodb".into()))?;
        if dynamodb.region.is_empty() {
            return Err(ConfigLoadError::MissingField("dynamodb.region".into()));
        }
        if dynamodb.table_name.is_empty() {
            return Err(ConfigLoadError::MissingField("dynamodb.table_name".into()));
        }
        Ok(())
    }

    pub fn backend_config(&self) -> Result<BackendConfig, ConfigLoadError> {
        match self.backend {
            BackendKind::Bigtable => Ok(BackendConfig::WideColumn(self.bigtable.clone())),
            BackendKind::Dynamodb => self
                .dynamodb
                .clone()
                .map(BackendConfig::KeyValue)
                .ok_or_else(|| ConfigLoadError::MissingField("dynamodb".into())),
            BackendKind::Memory => Ok(BackendConfig::InMemory),
        }
    }

    /// A fetcher wired to the configured backend and test ids. The backend
    /// itself is not built until the first lookup.
    pub fn fetcher(&self) -> Result<ProfileFetcher, ConfigLoadError> {
        let backend = self.backend_config()?;
        let codec = self.codec();
        let fetcher = ProfileFetcher::with_factory(move || backend.build_with_codec(codec));
        Ok(fetcher.with_test_ids(self.test_client_ids.clone()))
    }

    pub fn codec(&self) -> PayloadCodec {
        PayloadCodec::new(self.compression_level)
    }
}
