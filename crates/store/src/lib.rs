//! # Profile Store
//!
//! Backend-agnostic storage for client profile records. A profile is stored
//! as a single zlib-compressed JSON payload under the client's identifier, in
//! one of two interchangeable backends:
//!
//! - [`WideColumnBackend`]: one row per client in a Bigtable-style table,
//!   column `profile:payload`, newest cell wins.
//! - [`KeyValueBackend`]: one item per client in a DynamoDB-style table,
//!   attribute `json_payload`.
//!
//! Both implement [`ProfileBackend`]. Reads never fail: they return a
//! [`Lookup`] that distinguishes a found record, a missing one, and a record
//! that could not be read (transport failure or corrupt payload). Writes
//! return a `Result` and propagate every failure.
//!
//! Each backend talks to its table through a small client trait
//! ([`WideColumnTable`], [`KeyValueTable`]). In-memory tables ship with the
//! crate; the Bigtable and DynamoDB clients sit behind the `bigtable` and
//! `dynamodb` features.
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use store::{BackendConfig, Lookup};
//!
//! let backend = BackendConfig::in_memory().build().unwrap();
//! let record = json!({"client_id": "abc123", "city": "Paris"});
//! backend.put_profile(record.as_object().unwrap()).unwrap();
//!
//! match backend.get_profile("abc123") {
//!     Lookup::Found(raw) => assert_eq!(raw["city"], "Paris"),
//!     other => panic!("unexpected lookup: {other:?}"),
//! }
//! assert_eq!(backend.get_profile("nobody"), Lookup::NotFound);
//! ```

mod backend;
pub mod codec;
mod error;

pub use backend::key_value::{
    AttributeValue, Item, KeyValueBackend, KeyValueTable, KEY_ATTRIBUTE, PAYLOAD_ATTRIBUTE,
};
pub use backend::memory::{MemoryKeyValueTable, MemoryWideColumnTable};
pub use backend::wide_column::{
    Cell, ColumnFamily, GcRule, WideColumnBackend, WideColumnTable, PAYLOAD_QUALIFIER,
    PROFILE_COLUMN_FAMILY, PROFILE_MAX_AGE,
};
pub use backend::{BackendConfig, KeyValueConfig, Lookup, ProfileBackend, WideColumnConfig};
pub use codec::PayloadCodec;
pub use error::{StoreError, StoreResult};

#[cfg(feature = "bigtable")]
pub use backend::bigtable::BigtableTable;
#[cfg(feature = "dynamodb")]
pub use backend::dynamodb::DynamoDbTable;

/// Backend-native profile: arbitrary, possibly sparse JSON fields.
pub type RawProfileRecord = serde_json::Map<String, serde_json::Value>;

/// The row/item key a record is written under.
pub fn record_client_id(record: &RawProfileRecord) -> StoreResult<&str> {
    record
        .get("client_id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(StoreError::MissingClientId)
}
