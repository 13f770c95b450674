//! Cloud Bigtable client for [`WideColumnBackend`](super::wide_column::WideColumnBackend).
//!
//! `bigtable_rs` is async; this client owns a small tokio runtime and blocks
//! on it, so it must not be called from inside another tokio runtime.
//! Credentials come from the usual Google application-default chain, or the
//! emulator when `BIGTABLE_EMULATOR_HOST` is set.
//!
//! Table administration (creating the `profile` family and its GC rule) is
//! done out of band, e.g. with `cbt createfamily` / `cbt setgcpolicy`.

use bigtable_rs::bigtable::BigTableConnection;
use bigtable_rs::google::bigtable::v2::mutation::{self, SetCell};
use bigtable_rs::google::bigtable::v2::row_filter::Filter;
use bigtable_rs::google::bigtable::v2::{
    MutateRowRequest, Mutation, ReadRowsRequest, RowFilter, RowSet,
};
use tokio::runtime::{Builder, Runtime};
use tracing::info;

use super::wide_column::{Cell, ColumnFamily, WideColumnTable};
use crate::{StoreError, StoreResult, WideColumnConfig};

pub struct BigtableTable {
    connection: BigTableConnection,
    table_name: String,
    runtime: Runtime,
}

impl BigtableTable {
    pub fn connect(config: &WideColumnConfig) -> StoreResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("bigtable-client")
            .enable_all()
            .build()
            .map_err(StoreError::backend)?;

        let connection = runtime
            .block_on(BigTableConnection::new(
                &config.project_id,
                &config.instance_id,
                false,
                1,
                Some(config.timeout()),
            ))
            .map_err(StoreError::backend)?;
        let table_name = connection.client().get_full_table_name(&config.table_id);

        info!(table = %table_name, "connected to bigtable");
        Ok(Self {
            connection,
            table_name,
            runtime,
        })
    }
}

impl WideColumnTable for BigtableTable {
    fn read_latest_cell(
        &self,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
    ) -> StoreResult<Option<Cell>> {
        let request = ReadRowsRequest {
            table_name: self.table_name.clone(),
            rows_limit: 1,
            rows: Some(RowSet {
                row_keys: vec![row_key.to_vec()],
                row_ranges: vec![],
            }),
            filter: Some(RowFilter {
                filter: Some(Filter::CellsPerColumnLimitFilter(1)),
            }),
            ..ReadRowsRequest::default()
        };

        let mut client = self.connection.client();
        let rows = self
            .runtime
            .block_on(client.read_rows(request))
            .map_err(StoreError::transport)?;

        Ok(rows
            .into_iter()
            .filter(|(key, _)| key.as_slice() == row_key)
            .flat_map(|(_, cells)| cells)
            .filter(|cell| cell.family_name == family && cell.qualifier == qualifier)
            .max_by_key(|cell| cell.timestamp_micros)
            .map(|cell| Cell {
                value: cell.value,
                timestamp_micros: cell.timestamp_micros,
            }))
    }

    fn write_cell(
        &self,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
        cell: Cell,
    ) -> StoreResult<()> {
        let request = MutateRowRequest {
            table_name: self.table_name.clone(),
            row_key: row_key.to_vec(),
            mutations: vec![Mutation {
                mutation: Some(mutation::Mutation::SetCell(SetCell {
                    family_name: family.to_string(),
                    column_qualifier: qualifier.to_vec(),
                    timestamp_micros: cell.timestamp_micros,
                    value: cell.value,
                })),
            }],
            ..MutateRowRequest::default()
        };

        let mut client = self.connection.client();
        self.runtime
            .block_on(client.mutate_row(request))
            .map(|_| ())
            .map_err(StoreError::transport)
    }

    /// Always fails with [`StoreError::Unsupported`].
    ///
    /// `bigtable_rs` only speaks the data API (`google.bigtable.v2`); it has no
    /// table admin client. Create the family and its GC union out of band:
    ///
    /// ```text
    /// cbt createtable <table> families=profile:maxage=90d||maxversions=1
    /// ```
    fn create_table(&self, family: &ColumnFamily) -> StoreResult<()> {
        Err(StoreError::Unsupported(format!(
            "bigtable_rs has no admin client; create family `{}` on `{}` with cbt",
            family.id, self.table_name
        )))
    }
}
