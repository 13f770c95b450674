//! In-memory table clients, used for tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::Utc;

use super::key_value::{AttributeValue, Item, KeyValueTable};
use super::wide_column::{Cell, ColumnFamily, GcRule, WideColumnTable};
use crate::{StoreError, StoreResult};

type ColumnKey = (String, Vec<u8>);
type Row = HashMap<ColumnKey, Vec<Cell>>;

/// A wide-column table held in a `RwLock`ed map.
///
/// Cells of each column are kept newest first, and the owning family's GC
/// rule is applied on every write. Writes to a family that was never created
/// fail.
#[derive(Default)]
pub struct MemoryWideColumnTable {
    families: RwLock<HashMap<String, GcRule>>,
    rows: RwLock<HashMap<Vec<u8>, Row>>,
}

impl MemoryWideColumnTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of versions currently retained for `family:qualifier`.
    pub fn version_count(&self, row_key: &[u8], family: &str, qualifier: &[u8]) -> usize {
        let guard = self.rows.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .get(row_key)
            .and_then(|row| row.get(&(family.to_string(), qualifier.to_vec())))
            .map_or(0, Vec::len)
    }
}

fn age_of(cell: &Cell, now_micros: i64) -> Duration {
    let micros = now_micros.saturating_sub(cell.timestamp_micros).max(0);
    Duration::from_micros(micros as u64)
}

impl WideColumnTable for MemoryWideColumnTable {
    fn read_latest_cell(
        &self,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
    ) -> StoreResult<Option<Cell>> {
        let guard = self
            .rows
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard
            .get(row_key)
            .and_then(|row| row.get(&(family.to_string(), qualifier.to_vec())))
            .and_then(|cells| cells.first().cloned()))
    }

    fn write_cell(
        &self,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
        cell: Cell,
    ) -> StoreResult<()> {
        let gc_rule = self
            .families
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .get(family)
            .cloned()
            .ok_or_else(|| {
                StoreError::Backend(format!("column family `{family}` does not exist"))
            })?;

        let mut guard = self
            .rows
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        let cells = guard
            .entry(row_key.to_vec())
            .or_default()
            .entry((family.to_string(), qualifier.to_vec()))
            .or_default();

        // A write at an existing timestamp replaces that version.
        cells.retain(|existing| existing.timestamp_micros != cell.timestamp_micros);
        cells.push(cell);
        cells.sort_by(|a, b| b.timestamp_micros.cmp(&a.timestamp_micros));

        let now = Utc::now().timestamp_micros();
        let mut version = 0;
        cells.retain(|cell| {
            let keep = !gc_rule.collects(version, age_of(cell, now));
            version += 1;
            keep
        });
        Ok(())
    }

    fn create_table(&self, family: &ColumnFamily) -> StoreResult<()> {
        let mut families = self
            .families
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        families.clear();
        families.insert(family.id.clone(), family.gc_rule.clone());
        Ok(())
    }
}

/// A key-value table held in a `RwLock`ed map.
#[derive(Default)]
pub struct MemoryKeyValueTable {
    items: RwLock<HashMap<String, Item>>,
}

impl MemoryKeyValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueTable for MemoryKeyValueTable {
    fn get_item(&self, _key_attribute: &str, key: &str) -> StoreResult<Option<Item>> {
        let guard = self
            .items
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn put_item(&self, key_attribute: &str, item: Item) -> StoreResult<()> {
        let key = match item.get(key_attribute) {
            Some(AttributeValue::S(key)) => key.clone(),
            _ => {
                return Err(StoreError::Backend(format!(
                    "item is missing string key attribute `{key_attribute}`"
                )))
            }
        };
        self.items
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .insert(key, item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::wide_column::{
        PAYLOAD_QUALIFIER, PROFILE_COLUMN_FAMILY, PROFILE_MAX_AGE,
    };

    fn profile_table() -> MemoryWideColumnTable {
        let table = MemoryWideColumnTable::new();
        table.create_table(&ColumnFamily::profile()).unwrap();
        table
    }

    #[test]
    fn keeps_only_the_newest_version() {
        let table = profile_table();
        for value in [b"one".to_vec(), b"two".to_vec(), b"three".to_vec()] {
            table
                .write_cell(
                    b"row",
                    PROFILE_COLUMN_FAMILY,
                    PAYLOAD_QUALIFIER,
                    Cell::now(value),
                )
                .unwrap();
        }

        assert_eq!(
            table.version_count(b"row", PROFILE_COLUMN_FAMILY, PAYLOAD_QUALIFIER),
            1
        );
        let latest = table
            .read_latest_cell(b"row", PROFILE_COLUMN_FAMILY, PAYLOAD_QUALIFIER)
            .unwrap()
            .unwrap();
        assert_eq!(latest.value, b"three");
    }

    #[test]
    fn write_at_same_timestamp_overwrites() {
        let table = MemoryWideColumnTable::new();
        table
            .create_table(&ColumnFamily {
                id: "f".into(),
                gc_rule: GcRule::MaxVersions(5),
            })
            .unwrap();

        let ts = Utc::now().timestamp_millis() * 1000;
        for value in [b"first".to_vec(), b"second".to_vec()] {
            table
                .write_cell(b"row", "f", b"q", Cell { value, timestamp_micros: ts })
                .unwrap();
        }

        let latest = table.read_latest_cell(b"row", "f", b"q").unwrap().unwrap();
        assert_eq!(latest.value, b"second");
        assert_eq!(table.version_count(b"row", "f", b"q"), 1);
    }

    #[test]
    fn same_timestamp_under_profile_gc_keeps_the_newer_write() {
        let table = profile_table();
        let ts = Utc::now().timestamp_millis() * 1000;
        for value in [b"first".to_vec(), b"second".to_vec()] {
            table
                .write_cell(
                    b"row",
                    PROFILE_COLUMN_FAMILY,
                    PAYLOAD_QUALIFIER,
                    Cell { value, timestamp_micros: ts },
                )
                .unwrap();
        }

        let latest = table
            .read_latest_cell(b"row", PROFILE_COLUMN_FAMILY, PAYLOAD_QUALIFIER)
            .unwrap()
            .unwrap();
        assert_eq!(latest.value, b"second");
    }

    #[test]
    fn newest_timestamp_wins_regardless_of_write_order() {
        let table = MemoryWideColumnTable::new();
        table
            .create_table(&ColumnFamily {
                id: "f".into(),
                gc_rule: GcRule::MaxVersions(5),
            })
            .unwrap();

        let now = Utc::now().timestamp_millis() * 1000;
        for (value, ts) in [(b"new".to_vec(), now), (b"old".to_vec(), now - 5_000)] {
            table
                .write_cell(b"row", "f", b"q", Cell { value, timestamp_micros: ts })
                .unwrap();
        }

        let latest = table.read_latest_cell(b"row", "f", b"q").unwrap().unwrap();
        assert_eq!(latest.value, b"new");
        assert_eq!(table.version_count(b"row", "f", b"q"), 2);
    }

    #[test]
    fn expired_cells_are_collected() {
        let table = profile_table();
        let stale = Utc::now().timestamp_micros()
            - PROFILE_MAX_AGE.as_micros() as i64
            - 1_000_000;
        table
            .write_cell(
                b"row",
                PROFILE_COLUMN_FAMILY,
                PAYLOAD_QUALIFIER,
                Cell { value: b"stale".to_vec(), timestamp_micros: stale },
            )
            .unwrap();

        assert!(table
            .read_latest_cell(b"row", PROFILE_COLUMN_FAMILY, PAYLOAD_QUALIFIER)
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_family_is_rejected() {
        let table = MemoryWideColumnTable::new();
        let err = table
            .write_cell(b"row", "profile", b"payload", Cell::now(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn key_value_put_requires_key_attribute() {
        let table = MemoryKeyValueTable::new();
        let err = table.put_item("client_id", Item::new()).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(table.is_empty());
    }
}
