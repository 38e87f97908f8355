use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::{Stream, StreamExt, ready};
use pin_project_lite::pin_project;
use postgres::schema::{TableName, TableSchema};
use thiserror::Error;
use tokio_postgres::RowStream;

use crate::clients::postgres::{
    PreparedStatementBuilder, SnapshotClient, SnapshotClientError, StatementBuilder,
};
use crate::config::DataSourceConfig;
use crate::conversions::table_row::{
    GenericRowConverter, RowConversionError, RowConverter, TableRow,
};

use super::{DataSourceProvider, DumpRows, DumpSession, SourceError};

/// Opens snapshot sessions against a standard Postgres data source.
///
/// The provider carries the statement-building and value-decoding strategies that get
/// installed on every session it opens.
pub struct PostgresSourceProvider {
    statement_builder: Arc<dyn StatementBuilder>,
    converter: Arc<dyn RowConverter>,
}

impl PostgresSourceProvider {
    pub fn new() -> PostgresSourceProvider {
        Self::with_strategies(
            Arc::new(PreparedStatementBuilder),
            Arc::new(GenericRowConverter),
        )
    }

    /// Creates a provider with custom statement-building and value-decoding strategies.
    pub fn with_strategies(
        statement_builder: Arc<dyn StatementBuilder>,
        converter: Arc<dyn RowConverter>,
    ) -> PostgresSourceProvider {
        Self {
            statement_builder,
            converter,
        }
    }
}

impl Default for PostgresSourceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSourceProvider for PostgresSourceProvider {
    type Session = PostgresDumpSession;

    async fn get_data_source(
        &self,
        config: &DataSourceConfig,
    ) -> Result<Self::Session, SourceError> {
        let connection_config = config
            .connection_config()
            .ok_or(SourceError::UnsupportedDataSource(config.kind()))?;
        let client = SnapshotClient::connect(connection_config).await?;

        Ok(PostgresDumpSession {
            client,
            statement_builder: self.statement_builder.clone(),
            converter: self.converter.clone(),
        })
    }
}

/// One exclusively owned Postgres connection; dropping the session tears it down.
pub struct PostgresDumpSession {
    client: SnapshotClient,
    statement_builder: Arc<dyn StatementBuilder>,
    converter: Arc<dyn RowConverter>,
}

#[async_trait]
impl DumpSession for PostgresDumpSession {
    async fn get_table_schema(&self, table_name: &TableName) -> Result<TableSchema, SourceError> {
        self.client
            .get_table_schema(table_name)
            .await
            .map_err(|e| match e {
                SnapshotClientError::MissingTable(name) => SourceError::MissingTable(name),
                e => SourceError::SnapshotClient(e),
            })
    }

    async fn get_dump_rows(&self, sql: &str) -> Result<DumpRows, SourceError> {
        let statement = self
            .client
            .prepare_with(self.statement_builder.as_ref(), sql)
            .await?;
        let column_names = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        let stream = self.client.get_row_stream(&statement).await?;
        let stream = SnapshotRowStream::wrap(stream, self.converter.clone());

        Ok(DumpRows {
            column_names,
            rows: Box::pin(stream.map(|row| row.map_err(SourceError::RowStream))),
        })
    }
}

#[derive(Debug, Error)]
pub enum SnapshotRowStreamError {
    #[error("tokio_postgres error: {0}")]
    TokioPostgresError(#[from] tokio_postgres::Error),

    #[error("conversion error: {0}")]
    ConversionError(#[from] RowConversionError),
}

pin_project! {
    /// A stream of result rows decoded through the session's [`RowConverter`].
    #[must_use = "streams do nothing unless polled"]
    pub struct SnapshotRowStream {
        #[pin]
        stream: RowStream,
        converter: Arc<dyn RowConverter>,
    }
}

impl SnapshotRowStream {
    fn wrap(stream: RowStream, converter: Arc<dyn RowConverter>) -> SnapshotRowStream {
        Self { stream, converter }
    }
}

impl Stream for SnapshotRowStream {
    type Item = Result<TableRow, SnapshotRowStreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.stream.poll_next(cx)) {
            Some(Ok(row)) => match this.converter.try_from(&row) {
                Ok(row) => Poll::Ready(Some(Ok(row))),
                Err(e) => Poll::Ready(Some(Err(e.into()))),
            },
            Some(Err(e)) => Poll::Ready(Some(Err(e.into()))),
            None => Poll::Ready(None),
        }
    }
}
