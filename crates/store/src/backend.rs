use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PayloadCodec, RawProfileRecord, StoreError, StoreResult};

/// Outcome of a profile read.
///
/// Callers that only care about "usable data or not" collapse this with
/// [`Lookup::into_record`].
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The stored record, decoded.
    Found(RawProfileRecord),
    /// No row or item exists for the client.
    NotFound,
    /// Something exists but could not be read: transport failure or a corrupt
    /// payload. Already logged by the backend.
    Unavailable(StoreError),
}

impl Lookup {
    pub fn into_record(self) -> Option<RawProfileRecord> {
        match self {
            Lookup::Found(record) => Some(record),
            Lookup::NotFound | Lookup::Unavailable(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// A storage backend for profile records.
///
/// Implementations must be safe to share between threads; the fetcher holds a
/// single instance behind an `Arc` and calls it concurrently.
pub trait ProfileBackend: Send + Sync {
    /// Read the most recent record stored for `client_id`.
    fn get_profile(&self, client_id: &str) -> Lookup;

    /// Store `record` under its own `client_id` field. Single-row,
    /// last-write-wins.
    fn put_profile(&self, record: &RawProfileRecord) -> StoreResult<()>;

    /// Short label for log lines.
    fn kind(&self) -> &'static str;
}

/// Location of the wide-column profile table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideColumnConfig {
    #[serde(default = "default_project_id")]
    pub project_id: String,
    #[serde(default = "default_instance_id")]
    pub instance_id: String,
    #[serde(default = "default_table_id")]
    pub table_id: String,
    /// Per-request timeout handed to the cloud client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WideColumnConfig {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            instance_id: default_instance_id(),
            table_id: default_table_id(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WideColumnConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_project_id() -> String {
    "cfr-personalization-experiment".to_string()
}

fn default_instance_id() -> String {
    "taar-profile".to_string()
}

fn default_table_id() -> String {
    "test-table".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Location of the key-value profile table. Both fields are required.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueConfig {
    pub region: String,
    pub table_name: String,
}

impl KeyValueConfig {
    pub fn new(region: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            table_name: table_name.into(),
        }
    }
}

/// Selects and builds the active backend.
///
/// ```
/// use store::{BackendConfig, KeyValueConfig};
///
/// // Bigtable with the default project/instance/table
/// let config = BackendConfig::default();
///
/// // DynamoDB
/// let config = BackendConfig::key_value("us-west-2", "taar_addon_data_20180206");
///
/// // In-memory (for testing)
/// let config = BackendConfig::in_memory();
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendConfig {
    /// Bigtable-backed [`WideColumnBackend`]. Requires the `bigtable` feature.
    WideColumn(WideColumnConfig),
    /// DynamoDB-backed [`KeyValueBackend`]. Requires the `dynamodb` feature.
    KeyValue(KeyValueConfig),
    /// [`WideColumnBackend`] over a fresh in-memory table.
    InMemory,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::WideColumn(WideColumnConfig::default())
    }
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn wide_column(config: WideColumnConfig) -> Self {
        BackendConfig::WideColumn(config)
    }

    pub fn key_value(region: impl Into<String>, table_name: impl Into<String>) -> Self {
        BackendConfig::KeyValue(KeyValueConfig::new(region, table_name))
    }

    /// Construct the configured backend with the default payload codec.
    ///
    /// Cloud variants open a client connection here; bad credentials or an
    /// unreachable endpoint fail now rather than on the first read.
    pub fn build(&self) -> StoreResult<Arc<dyn ProfileBackend>> {
        self.build_with_codec(PayloadCodec::default())
    }

    /// Construct the configured backend, encoding writes with `codec`.
    pub fn build_with_codec(&self, codec: PayloadCodec) -> StoreResult<Arc<dyn ProfileBackend>> {
        match self {
            BackendConfig::InMemory => {
                let backend = wide_column::WideColumnBackend::in_memory()?.with_codec(codec);
                Ok(Arc::new(backend))
            }
            BackendConfig::WideColumn(config) => {
                #[cfg(feature = "bigtable")]
                {
                    let backend = wide_column::WideColumnBackend::connect(config)?;
                    Ok(Arc::new(backend.with_codec(codec)))
                }
                #[cfg(not(feature = "bigtable"))]
                {
                    let _ = config;
                    Err(StoreError::backend("bigtable backend disabled at compile time"))
                }
            }
            BackendConfig::KeyValue(config) => {
                #[cfg(feature = "dynamodb")]
                {
                    let backend = key_value::KeyValueBackend::connect(config)?;
                    Ok(Arc::new(backend.with_codec(codec)))
                }
                #[cfg(not(feature = "dynamodb"))]
                {
                    let _ = config;
                    Err(StoreError::backend("dynamodb backend disabled at compile time"))
                }
            }
        }
    }
}

pub mod key_value;
pub mod memory;
pub mod wide_column;

#[cfg(feature = "bigtable")]
pub mod bigtable;
#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wide_column_defaults() {
        let config = WideColumnConfig::default();
        assert_eq!(config.project_id, "cfr-personalization-experiment");
        assert_eq!(config.instance_id, "taar-profile");
        assert_eq!(config.table_id, "test-table");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(BackendConfig::default(), BackendConfig::WideColumn(config));
    }

    #[test]
    fn wide_column_config_fills_missing_fields() {
        let config: WideColumnConfig =
            serde_json::from_value(json!({"table_id": "prod-profiles"})).unwrap();
        assert_eq!(config.table_id, "prod-profiles");
        assert_eq!(config.project_id, "cfr-personalization-experiment");
    }

    #[test]
    fn key_value_config_requires_both_fields() {
        let result: Result<KeyValueConfig, _> =
            serde_json::from_value(json!({"region": "us-west-2"}));
        assert!(result.is_err());
    }

    #[test]
    fn in_memory_build_roundtrip() {
        let backend = BackendConfig::in_memory().build().unwrap();
        assert_eq!(backend.kind(), "wide-column");

        let record = json!({"client_id": "c1", "locale": "de"});
        backend.put_profile(record.as_object().unwrap()).unwrap();
        let found = backend.get_profile("c1").into_record().unwrap();
        assert_eq!(found["locale"], "de");
    }

    #[test]
    fn build_with_codec_stores_at_the_requested_level() {
        let backend = BackendConfig::in_memory()
            .build_with_codec(PayloadCodec::new(9))
            .unwrap();
        let record = json!({"client_id": "c2", "os": "Linux"});
        backend.put_profile(record.as_object().unwrap()).unwrap();
        assert_eq!(backend.get_profile("c2").into_record().unwrap()["os"], "Linux");
    }

    #[test]
    fn lookup_collapses_failures_to_none() {
        assert_eq!(Lookup::NotFound.into_record(), None);
        assert_eq!(
            Lookup::Unavailable(StoreError::transport("timeout")).into_record(),
            None
        );
        assert!(Lookup::Found(RawProfileRecord::new()).is_found());
    }
}
