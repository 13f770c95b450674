//! zlib-compressed JSON framing for profile records.
//!
//! Every stored cell or item holds `zlib(utf8(json(record)))`. The compression
//! level is fixed per [`PayloadCodec`] so encoding is deterministic in content,
//! though not guaranteed byte-identical across `flate2` releases.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::{RawProfileRecord, StoreError, StoreResult};

/// zlib's own default level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Encoder/decoder for stored profile payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayloadCodec {
    /// zlib level, 0 (store) to 9 (best).
    pub level: u32,
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self {
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl PayloadCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    /// Serialize `record` to JSON and deflate it.
    pub fn encode(&self, record: &RawProfileRecord) -> StoreResult<Vec<u8>> {
        let json = serde_json::to_vec(record).map_err(StoreError::backend)?;
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(json.len() / 2),
            Compression::new(self.level),
        );
        encoder.write_all(&json).map_err(StoreError::backend)?;
        encoder.finish().map_err(StoreError::backend)
    }

    /// Inflate `payload` and parse it back into a record.
    ///
    /// Any inflate, UTF-8, or JSON failure is a [`StoreError::CorruptPayload`],
    /// as is valid JSON whose top level is not an object.
    pub fn decode(&self, payload: &[u8]) -> StoreResult<RawProfileRecord> {
        let mut json = Vec::with_capacity(payload.len() * 4);
        ZlibDecoder::new(payload)
            .read_to_end(&mut json)
            .map_err(StoreError::corrupt)?;

        match serde_json::from_slice::<Value>(&json).map_err(StoreError::corrupt)? {
            Value::Object(record) => Ok(record),
            other => Err(StoreError::CorruptPayload(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Encode with the default codec.
pub fn encode(record: &RawProfileRecord) -> StoreResult<Vec<u8>> {
    PayloadCodec::default().encode(record)
}

/// Decode with the default codec. The level does not matter for inflation.
pub fn decode(payload: &[u8]) -> StoreResult<RawProfileRecord> {
    PayloadCodec::default().decode(payload)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
