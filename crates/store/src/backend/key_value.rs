//! DynamoDB-style backend: one item per client.
//!
//! The item is keyed by the `client_id` string attribute and carries the
//! encoded profile in the binary `json_payload` attribute. Every read-side
//! failure is logged and reported as [`Lookup::Unavailable`]; nothing on the
//! read path propagates.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::{Lookup, ProfileBackend};
use crate::{record_client_id, PayloadCodec, RawProfileRecord, StoreError, StoreResult};

pub const KEY_ATTRIBUTE: &str = "client_id";
pub const PAYLOAD_ATTRIBUTE: &str = "json_payload";

/// The attribute types a profile item uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeValue {
    S(String),
    B(Vec<u8>),
}

pub type Item = HashMap<String, AttributeValue>;

/// Client for a single key-value table.
pub trait KeyValueTable: Send + Sync {
    /// Fetch the item whose `key_attribute` equals `key`.
    fn get_item(&self, key_attribute: &str, key: &str) -> StoreResult<Option<Item>>;

    /// Insert or replace the item identified by its `key_attribute`.
    fn put_item(&self, key_attribute: &str, item: Item) -> StoreResult<()>;
}

pub struct KeyValueBackend {
    table: Arc<dyn KeyValueTable>,
    codec: PayloadCodec,
}

impl KeyValueBackend {
    pub fn new(table: Arc<dyn KeyValueTable>) -> Self {
        Self {
            table,
            codec: PayloadCodec::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(super::memory::MemoryKeyValueTable::new()))
    }

    /// Connect to the DynamoDB table named by `config`.
    #[cfg(feature = "dynamodb")]
    pub fn connect(config: &crate::KeyValueConfig) -> StoreResult<Self> {
        let table = super::dynamodb::DynamoDbTable::connect(config)?;
        Ok(Self::new(Arc::new(table)))
    }

    pub fn with_codec(mut self, codec: PayloadCodec) -> Self {
        self.codec = codec;
        self
    }
}

impl ProfileBackend for KeyValueBackend {
    fn get_profile(&self, client_id: &str) -> Lookup {
        let item = match self.table.get_item(KEY_ATTRIBUTE, client_id) {
            Ok(Some(item)) => item,
            Ok(None) => return Lookup::NotFound,
            Err(err) => {
                warn!(client_id, error = %err, "error loading client data");
                return Lookup::Unavailable(err);
            }
        };

        let payload = match item.get(PAYLOAD_ATTRIBUTE) {
            Some(AttributeValue::B(bytes)) => bytes,
            Some(AttributeValue::S(_)) => {
                let err = StoreError::CorruptPayload(format!(
                    "`{PAYLOAD_ATTRIBUTE}` is a string attribute, expected binary"
                ));
                warn!(client_id, error = %err, "error loading client data");
                return Lookup::Unavailable(err);
            }
            None => {
                debug!(client_id, "item has no `{PAYLOAD_ATTRIBUTE}` attribute");
                return Lookup::NotFound;
            }
        };

        match self.codec.decode(payload) {
            Ok(record) => Lookup::Found(record),
            Err(err) => {
                warn!(client_id, error = %err, "error loading client data");
                Lookup::Unavailable(err)
            }
        }
    }

    fn put_profile(&self, record: &RawProfileRecord) -> StoreResult<()> {
        let client_id = record_client_id(record)?;
        let payload = self.codec.encode(record)?;

        let item = Item::from([
            (
                KEY_ATTRIBUTE.to_string(),
                AttributeValue::S(client_id.to_string()),
            ),
            (PAYLOAD_ATTRIBUTE.to_string(), AttributeValue::B(payload)),
        ]);
        self.table.put_item(KEY_ATTRIBUTE, item)
    }

    fn kind(&self) -> &'static str {
        "key-value"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryKeyValueTable;
    use serde_json::json;

    fn record(value: serde_json::Value) -> RawProfileRecord {
        value.as_object().cloned().unwrap()
    }

    fn item(client_id: &str, payload: AttributeValue) -> Item {
        Item::from([
            (
                KEY_ATTRIBUTE.to_string(),
                AttributeValue::S(client_id.to_string()),
            ),
            (PAYLOAD_ATTRIBUTE.to_string(), payload),
        ])
    }

    struct TimeoutTable;

    impl KeyValueTable for TimeoutTable {
        fn get_item(&self, _: &str, _: &str) -> StoreResult<Option<Item>> {
            Err(StoreError::transport("request timed out"))
        }

        fn put_item(&self, _: &str, _: Item) -> StoreResult<()> {
            Err(StoreError::transport("request timed out"))
        }
    }

    #[test]
    fn put_then_get_roundtrip_keeps_extra_fields() {
        let backend = KeyValueBackend::in_memory();
        let rec = record(json!({
            "client_id": "abc123",
            "locale": "fr",
            "unknown_field": [1, 2, 3]
        }));
        backend.put_profile(&rec).unwrap();

        assert_eq!(backend.get_profile("abc123"), Lookup::Found(rec));
    }

    #[test]
    fn codec_level_applies_to_stored_items() {
        let table = Arc::new(MemoryKeyValueTable::new());
        let codec = PayloadCodec::new(9);
        let backend = KeyValueBackend::new(table.clone()).with_codec(codec);
        let rec = record(json!({"client_id": "abc123", "os": "Darwin"}));
        backend.put_profile(&rec).unwrap();

        let stored = table.get_item(KEY_ATTRIBUTE, "abc123").unwrap().unwrap();
        assert_eq!(
            stored.get(PAYLOAD_ATTRIBUTE),
            Some(&AttributeValue::B(codec.encode(&rec).unwrap()))
        );
    }

    #[test]
    fn missing_item_is_not_found() {
        let backend = KeyValueBackend::in_memory();
        assert_eq!(backend.get_profile("ghost"), Lookup::NotFound);
    }

    #[test]
    fn item_without_payload_is_not_found() {
        let table = Arc::new(MemoryKeyValueTable::new());
        table
            .put_item(
                KEY_ATTRIBUTE,
                Item::from([(
                    KEY_ATTRIBUTE.to_string(),
                    AttributeValue::S("abc123".into()),
                )]),
            )
            .unwrap();

        let backend = KeyValueBackend::new(table);
        assert_eq!(backend.get_profile("abc123"), Lookup::NotFound);
    }

    #[test]
    fn corrupt_payload_is_unavailable() {
        let table = Arc::new(MemoryKeyValueTable::new());
        table
            .put_item(KEY_ATTRIBUTE, item("abc123", AttributeValue::B(vec![0xde, 0xad])))
            .unwrap();

        let backend = KeyValueBackend::new(table);
        match backend.get_profile("abc123") {
            Lookup::Unavailable(err) => assert!(err.is_corrupt_payload()),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn string_payload_is_unavailable() {
        let table = Arc::new(MemoryKeyValueTable::new());
        table
            .put_item(KEY_ATTRIBUTE, item("abc123", AttributeValue::S("{}".into())))
            .unwrap();

        let backend = KeyValueBackend::new(table);
        assert!(matches!(
            backend.get_profile("abc123"),
            Lookup::Unavailable(StoreError::CorruptPayload(_))
        ));
    }

    #[test]
    fn transport_error_is_swallowed_on_read_and_propagated_on_write() {
        let backend = KeyValueBackend::new(Arc::new(TimeoutTable));
        assert!(matches!(
            backend.get_profile("abc123"),
            Lookup::Unavailable(StoreError::Transport(_))
        ));
        assert!(backend
            .put_profile(&record(json!({"client_id": "abc123"})))
            .is_err());
    }

    #[test]
    fn put_rejects_empty_client_id() {
        let backend = KeyValueBackend::in_memory();
        let err = backend
            .put_profile(&record(json!({"client_id": ""})))
            .unwrap_err();
        assert_eq!(err, StoreError::MissingClientId);
    }
}
