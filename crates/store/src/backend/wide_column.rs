//! Bigtable-style backend: one row per client, one cell per write.
//!
//! Row key is the UTF-8 client id. The payload lives in column
//! `profile:payload`; every write adds a new timestamped cell and the column
//! family's GC rule (`max age 90 days OR max 1 version`) keeps history
//! bounded. Reads only ever look at the newest cell.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::backend::{Lookup, ProfileBackend};
use crate::{record_client_id, PayloadCodec, RawProfileRecord, StoreError, StoreResult};

pub const PROFILE_COLUMN_FAMILY: &str = "profile";
pub const PAYLOAD_QUALIFIER: &[u8] = b"payload";
pub const PROFILE_MAX_AGE: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Garbage-collection rule for a column family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GcRule {
    /// Collect cells older than the given age.
    MaxAge(Duration),
    /// Keep only the newest N versions of each column.
    MaxVersions(usize),
    /// Collect a cell if any of the rules would.
    Union(Vec<GcRule>),
}

impl GcRule {
    /// Whether a cell at `version` (0 = newest) with the given age is collected.
    pub fn collects(&self, version: usize, age: Duration) -> bool {
        match self {
            GcRule::MaxAge(max_age) => age > *max_age,
            GcRule::MaxVersions(max) => version >= *max,
            GcRule::Union(rules) => rules.iter().any(|rule| rule.collects(version, age)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnFamily {
    pub id: String,
    pub gc_rule: GcRule,
}

impl ColumnFamily {
    /// The single family a profile table is created with.
    pub fn profile() -> Self {
        Self {
            id: PROFILE_COLUMN_FAMILY.to_string(),
            gc_rule: GcRule::Union(vec![
                GcRule::MaxAge(PROFILE_MAX_AGE),
                GcRule::MaxVersions(1),
            ]),
        }
    }
}

/// One timestamped cell version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub value: Vec<u8>,
    pub timestamp_micros: i64,
}

impl Cell {
    /// A cell stamped with the current time.
    ///
    /// Bigtable tables default to millisecond granularity, so the microsecond
    /// timestamp is truncated to a whole millisecond.
    pub fn now(value: Vec<u8>) -> Self {
        Self {
            value,
            timestamp_micros: Utc::now().timestamp_millis() * 1000,
        }
    }
}

/// Client for a single wide-column table.
pub trait WideColumnTable: Send + Sync {
    /// Newest cell of `family:qualifier` in the row, or `None` when the row or
    /// column does not exist.
    fn read_latest_cell(
        &self,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
    ) -> StoreResult<Option<Cell>>;

    fn write_cell(
        &self,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
        cell: Cell,
    ) -> StoreResult<()>;

    /// Create the table with exactly the given column family.
    fn create_table(&self, family: &ColumnFamily) -> StoreResult<()> {
        Err(StoreError::Unsupported(format!(
            "creating column family `{}` requires the table admin API",
            family.id
        )))
    }
}

pub struct WideColumnBackend {
    table: Arc<dyn WideColumnTable>,
    family: ColumnFamily,
    codec: PayloadCodec,
}

impl WideColumnBackend {
    pub fn new(table: Arc<dyn WideColumnTable>) -> Self {
        Self {
            table,
            family: ColumnFamily::profile(),
            codec: PayloadCodec::default(),
        }
    }

    /// Backend over a fresh in-memory table that already has the profile
    /// column family.
    pub fn in_memory() -> StoreResult<Self> {
        let backend = Self::new(Arc::new(super::memory::MemoryWideColumnTable::new()));
        backend.create_table()?;
        Ok(backend)
    }

    /// Connect to the Bigtable table named by `config`.
    #[cfg(feature = "bigtable")]
    pub fn connect(config: &crate::WideColumnConfig) -> StoreResult<Self> {
        let table = super::bigtable::BigtableTable::connect(config)?;
        Ok(Self::new(Arc::new(table)))
    }

    pub fn with_codec(mut self, codec: PayloadCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn column_family(&self) -> &ColumnFamily {
        &self.family
    }

    /// One-time administrative setup: create the table with the profile
    /// column family and its GC rule.
    pub fn create_table(&self) -> StoreResult<()> {
        self.table.create_table(&self.family)
    }
}

impl ProfileBackend for WideColumnBackend {
    fn get_profile(&self, client_id: &str) -> Lookup {
        let cell = match self.table.read_latest_cell(
            client_id.as_bytes(),
            &self.family.id,
            PAYLOAD_QUALIFIER,
        ) {
            Ok(Some(cell)) => cell,
            Ok(None) => return Lookup::NotFound,
            Err(err) => {
                warn!(client_id, error = %err, "wide-column read failed");
                return Lookup::Unavailable(err);
            }
        };

        match self.codec.decode(&cell.value) {
            Ok(record) => {
                debug!(
                    client_id,
                    timestamp_micros = cell.timestamp_micros,
                    "profile cell decoded"
                );
                Lookup::Found(record)
            }
            Err(err) => {
                warn!(client_id, error = %err, "discarding undecodable profile cell");
                Lookup::Unavailable(err)
            }
        }
    }

    fn put_profile(&self, record: &RawProfileRecord) -> StoreResult<()> {
        let client_id = record_client_id(record)?;
        let payload = self.codec.encode(record)?;
        self.table.write_cell(
            client_id.as_bytes(),
            &self.family.id,
            PAYLOAD_QUALIFIER,
            Cell::now(payload),
        )
    }

    fn kind(&self) -> &'static str {
        "wide-column"
    }
}
