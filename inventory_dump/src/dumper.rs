use futures::StreamExt;
use pg_escape::quote_identifier;
use postgres::schema::TableSchema;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::channel::{ChannelError, DumperChannel};
use crate::config::{DataSourceKind, DumperConfig};
use crate::conversions::Cell;
use crate::conversions::table_row::TableRow;
use crate::lifecycle::DumperHandle;
use crate::position::DumpPosition;
use crate::record::{ChangeType, Column, DataRecord, FinishedRecord, Record};
use crate::sources::{DataSourceProvider, DumpRows, DumpSession, SourceError};

#[derive(Debug, Error)]
pub enum DumperBuildError {
    #[error("data source kind '{0}' cannot be dumped")]
    UnsupportedDataSource(DataSourceKind),

    #[error("a primary key is configured without a position to scan")]
    MissingPosition,

    #[error("source error: {0}")]
    Source(#[from] SourceError),
}

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("no record channel is attached to the dumper")]
    MissingChannel,

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("primary key column {0} is missing from the dump result")]
    MissingPrimaryKeyColumn(String),

    #[error("primary key column {0} does not hold an integer value")]
    NonIntegerPrimaryKey(String),
}

/// Takes a point-in-time snapshot of one table and pushes it, row by row, into the
/// record channel as insert records.
///
/// The scan can be bounded to a primary-key range, in which case every pushed record
/// carries the narrowed range as its resume position. Two finished records terminate
/// the stream: one marking a clean end of the scan (pushed only when the row stream
/// was exhausted) and an unconditional one that lets the consumer unblock no matter
/// how the dump ended.
pub struct InventoryDumper<P: DataSourceProvider> {
    config: DumperConfig,
    provider: P,
    table_schema: TableSchema,
    handle: DumperHandle,
    channel: Option<DumperChannel>,
}

impl<P: DataSourceProvider> InventoryDumper<P> {
    /// Creates a dumper for the table named in `config`.
    ///
    /// Rejects configurations whose data source cannot be dumped directly, and
    /// configurations carrying a primary key without a position to scan. The table's
    /// schema is loaded through a short-lived session; a missing table or a failed
    /// metadata load fails construction.
    pub async fn new(
        config: DumperConfig,
        provider: P,
    ) -> Result<InventoryDumper<P>, DumperBuildError> {
        if config.data_source.kind() != DataSourceKind::Standard {
            return Err(DumperBuildError::UnsupportedDataSource(
                config.data_source.kind(),
            ));
        }

        if config.primary_key.is_some() && config.position.is_none() {
            return Err(DumperBuildError::MissingPosition);
        }

        let table_schema = {
            let session = provider.get_data_source(&config.data_source).await?;
            session.get_table_schema(&config.table_name).await?
        };

        Ok(InventoryDumper {
            config,
            provider,
            table_schema,
            handle: DumperHandle::new(),
            channel: None,
        })
    }

    /// Returns a handle onto this dumper's lifecycle, usable to stop it from another
    /// task.
    pub fn handle(&self) -> DumperHandle {
        self.handle.clone()
    }

    /// Attaches the channel dumped records are pushed into.
    pub fn set_channel(&mut self, channel: DumperChannel) {
        self.channel = Some(channel);
    }

    /// Starts the dump.
    ///
    /// The first call moves the dumper to running and drives the dump to completion;
    /// later calls observe the spent lifecycle and return without dumping.
    pub async fn start(&mut self) -> Result<(), DumpError> {
        if !self.handle.start() {
            warn!(
                "inventory dumper not started, lifecycle is {}",
                self.handle.state()
            );
            return Ok(());
        }

        self.dump().await
    }

    async fn dump(&mut self) -> Result<(), DumpError> {
        let Some(channel) = self.channel.clone() else {
            self.handle.stop();
            return Err(DumpError::MissingChannel);
        };

        let result = self.dump_table(&channel).await;

        match &result {
            Ok(()) => {
                self.handle.finish();
            }
            Err(e) => {
                error!("inventory dump failed: {e}");
                self.handle.stop();
                channel.close();
            }
        }

        // the consumer unblocks on this marker no matter how the dump ended
        if let Err(e) = channel
            .push_record(Record::Finished(FinishedRecord::placeholder()))
            .await
        {
            debug!("end-of-stream marker not delivered: {e}");
        }

        result
    }

    async fn dump_table(&self, channel: &DumperChannel) -> Result<(), DumpError> {
        // the session owns the connection and must outlive the row stream
        let session = self
            .provider
            .get_data_source(&self.config.data_source)
            .await?;

        let sql = build_dump_query(&self.config);
        info!("inventory dump, sql: {sql}");

        let DumpRows {
            column_names,
            mut rows,
        } = session.get_dump_rows(&sql).await?;

        let mut row_count = 0u64;
        let mut exhausted = false;

        while self.handle.is_running() {
            let Some(row) = rows.next().await else {
                exhausted = true;
                break;
            };
            let row = row?;

            let position = self.row_position(&column_names, &row)?;
            let record = self.data_record(position, &column_names, row);
            channel.push_record(Record::Data(record)).await?;
            row_count += 1;
        }

        info!("inventory dump ended, row count: {row_count}");

        if exhausted {
            // only a true end of the scan gets the clean finished marker
            if let Err(e) = channel
                .push_record(Record::Finished(FinishedRecord::finished()))
                .await
            {
                debug!("finished marker not delivered: {e}");
            }
        }

        Ok(())
    }

    fn row_position(
        &self,
        column_names: &[String],
        row: &TableRow,
    ) -> Result<DumpPosition, DumpError> {
        let (Some(primary_key), Some(position)) =
            (self.config.primary_key.as_deref(), self.config.position)
        else {
            return Ok(DumpPosition::Placeholder);
        };

        let index = column_names
            .iter()
            .position(|name| name == primary_key)
            .ok_or_else(|| DumpError::MissingPrimaryKeyColumn(primary_key.to_string()))?;
        let value = row
            .values
            .get(index)
            .and_then(Cell::as_i64)
            .ok_or_else(|| DumpError::NonIntegerPrimaryKey(primary_key.to_string()))?;

        Ok(DumpPosition::PrimaryKey(position.advance_to(value)))
    }

    fn data_record(
        &self,
        position: DumpPosition,
        column_names: &[String],
        row: TableRow,
    ) -> DataRecord {
        // the dump query selects *, so result ordinals line up with schema ordinals
        let columns = column_names
            .iter()
            .zip(row.values)
            .enumerate()
            .map(|(i, (name, value))| {
                Column::new(name.clone(), value, true, self.table_schema.is_primary_key(i))
            })
            .collect();

        DataRecord::new(
            position,
            ChangeType::Insert,
            self.config.logical_table_name().to_string(),
            columns,
        )
    }
}

fn build_dump_query(config: &DumperConfig) -> String {
    let table = config.table_name.as_quoted_identifier();
    match (config.primary_key.as_deref(), config.position) {
        (Some(primary_key), Some(position)) => format!(
            "SELECT * FROM {} WHERE {} BETWEEN {} AND {}",
            table,
            quote_identifier(primary_key),
            position.begin,
            position.end
        ),
        _ => format!("SELECT * FROM {table}"),
    }
}
