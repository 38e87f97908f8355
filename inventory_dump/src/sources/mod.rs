use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use ::postgres::schema::{TableName, TableSchema};
use thiserror::Error;

use crate::clients::postgres::SnapshotClientError;
use crate::config::{DataSourceConfig, DataSourceKind};
use crate::conversions::table_row::TableRow;

use self::postgres::SnapshotRowStreamError;

pub mod postgres;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("snapshot client error: {0}")]
    SnapshotClient(#[from] SnapshotClientError),

    #[error("row stream error: {0}")]
    RowStream(#[from] SnapshotRowStreamError),

    #[error("table {0} doesn't exist")]
    MissingTable(TableName),

    #[error("data source kind '{0}' cannot be dumped directly")]
    UnsupportedDataSource(DataSourceKind),

    #[error("data access error: {0}")]
    DataAccess(String),
}

/// A stream of converted table rows.
pub type TableRowStream = Pin<Box<dyn Stream<Item = Result<TableRow, SourceError>> + Send>>;

/// The result of executing a dump query: the result-set column names plus a
/// forward-only stream over its rows.
pub struct DumpRows {
    pub column_names: Vec<String>,
    pub rows: TableRowStream,
}

/// Hands out scoped sessions against a configured data source.
#[async_trait]
pub trait DataSourceProvider {
    type Session: DumpSession;

    /// Opens a session against the configured data source.
    ///
    /// Fails with [`SourceError::UnsupportedDataSource`] when the configuration kind
    /// does not describe a directly connectable source.
    async fn get_data_source(
        &self,
        config: &DataSourceConfig,
    ) -> Result<Self::Session, SourceError>;
}

/// An exclusively owned connection to a data source, released on drop.
#[async_trait]
pub trait DumpSession: Send {
    /// Loads the schema of `table_name`, including primary-key membership per column.
    async fn get_table_schema(&self, table_name: &TableName) -> Result<TableSchema, SourceError>;

    /// Executes the dump query and returns its column names together with a stream over
    /// its rows.
    async fn get_dump_rows(&self, sql: &str) -> Result<DumpRows, SourceError>;
}
