use async_trait::async_trait;
use pg_escape::quote_literal;
use postgres::schema::{ColumnSchema, Oid, TableName, TableSchema};
use postgres::tokio::config::PgConnectionConfig;
use thiserror::Error;
use tokio_postgres::types::{Kind, ToSql, Type};
use tokio_postgres::{Client as PostgresClient, NoTls, RowStream, SimpleQueryMessage, Statement};
use tracing::{info, warn};

/// A client for reading table snapshots from Postgres
pub struct SnapshotClient {
    postgres_client: PostgresClient,
}

#[derive(Debug, Error)]
pub enum SnapshotClientError {
    #[error("tokio_postgres error: {0}")]
    TokioPostgresError(#[from] tokio_postgres::Error),

    #[error("column {0} is missing from table {1}")]
    MissingColumn(String, String),

    #[error("oid column is not a valid u32")]
    OidColumnNotU32,

    #[error("type modifier column is not a valid i32")]
    TypeModifierColumnNotI32,

    #[error("table {0} doesn't exist")]
    MissingTable(TableName),
}

/// A strategy for turning dump SQL text into an executable statement.
///
/// [`PreparedStatementBuilder`] plainly prepares the statement server-side; a custom
/// implementation can adjust the session (e.g. cursor or fetch settings) before
/// preparing, which some server flavors need for large scans.
#[async_trait]
pub trait StatementBuilder: Send + Sync {
    async fn build(
        &self,
        client: &PostgresClient,
        sql: &str,
    ) -> Result<Statement, tokio_postgres::Error>;
}

/// Prepares the dump query server-side with no session adjustments.
pub struct PreparedStatementBuilder;

#[async_trait]
impl StatementBuilder for PreparedStatementBuilder {
    async fn build(
        &self,
        client: &PostgresClient,
        sql: &str,
    ) -> Result<Statement, tokio_postgres::Error> {
        client.prepare(sql).await
    }
}

impl SnapshotClient {
    /// Connect to a postgres database without TLS
    pub async fn connect(config: PgConnectionConfig) -> Result<SnapshotClient, SnapshotClientError> {
        info!("connecting to postgres");

        let (postgres_client, connection) = config.with_db().connect(NoTls).await?;

        tokio::spawn(async move {
            info!("waiting for connection to terminate");
            if let Err(e) = connection.await {
                warn!("connection error: {}", e);
            }
        });

        info!("successfully connected to postgres");

        Ok(SnapshotClient { postgres_client })
    }

    /// Returns the schema of a table, including which columns form its primary key.
    pub async fn get_table_schema(
        &self,
        table_name: &TableName,
    ) -> Result<TableSchema, SnapshotClientError> {
        let table_id = self
            .get_table_id(table_name)
            .await?
            .ok_or(SnapshotClientError::MissingTable(table_name.clone()))?;
        let column_schemas = self.get_column_schemas(table_id).await?;
        Ok(TableSchema::new(table_id, table_name.clone(), column_schemas))
    }

    /// Returns the table id (called relation id in Postgres) of a table
    pub async fn get_table_id(
        &self,
        table: &TableName,
    ) -> Result<Option<Oid>, SnapshotClientError> {
        let quoted_schema = quote_literal(&table.schema);
        let quoted_name = quote_literal(&table.name);

        let table_info_query = format!(
            "select c.oid
            from pg_class c
            join pg_namespace n
                on (c.relnamespace = n.oid)
            where n.nspname = {}
                and c.relname = {}
            ",
            quoted_schema, quoted_name
        );

        for message in self.postgres_client.simple_query(&table_info_query).await? {
            if let SimpleQueryMessage::Row(row) = message {
                let oid: Oid = row
                    .try_get("oid")?
                    .ok_or(SnapshotClientError::MissingColumn(
                        "oid".to_string(),
                        "pg_class".to_string(),
                    ))?
                    .parse()
                    .map_err(|_| SnapshotClientError::OidColumnNotU32)?;
                return Ok(Some(oid));
            }
        }

        Ok(None)
    }

    /// Returns a vector of columns of a table in column order
    pub async fn get_column_schemas(
        &self,
        table_id: Oid,
    ) -> Result<Vec<ColumnSchema>, SnapshotClientError> {
        let column_info_query = format!(
            "select a.attname,
                a.atttypid,
                a.atttypmod,
                a.attnotnull,
                coalesce(i.indisprimary, false) as primary
            from pg_attribute a
            left join pg_index i
                on a.attrelid = i.indrelid
                and a.attnum = any(i.indkey)
                and i.indisprimary = true
            where a.attnum > 0::int2
            and not a.attisdropped
            and a.attgenerated = ''
            and a.attrelid = {table_id}
            order by a.attnum
            ",
        );

        let mut column_schemas = vec![];

        for message in self
            .postgres_client
            .simple_query(&column_info_query)
            .await?
        {
            if let SimpleQueryMessage::Row(row) = message {
                let name = row
                    .try_get("attname")?
                    .ok_or(SnapshotClientError::MissingColumn(
                        "attname".to_string(),
                        "pg_attribute".to_string(),
                    ))?
                    .to_string();

                let type_oid = row
                    .try_get("atttypid")?
                    .ok_or(SnapshotClientError::MissingColumn(
                        "atttypid".to_string(),
                        "pg_attribute".to_string(),
                    ))?
                    .parse()
                    .map_err(|_| SnapshotClientError::OidColumnNotU32)?;

                //TODO: look up composite/array kinds from pg_type instead of assuming simple
                let typ = Type::from_oid(type_oid).unwrap_or(Type::new(
                    format!("unnamed(oid: {type_oid})"),
                    type_oid,
                    Kind::Simple,
                    "pg_catalog".to_string(),
                ));

                let modifier = row
                    .try_get("atttypmod")?
                    .ok_or(SnapshotClientError::MissingColumn(
                        "atttypmod".to_string(),
                        "pg_attribute".to_string(),
                    ))?
                    .parse()
                    .map_err(|_| SnapshotClientError::TypeModifierColumnNotI32)?;

                let nullable = row
                    .try_get("attnotnull")?
                    .ok_or(SnapshotClientError::MissingColumn(
                        "attnotnull".to_string(),
                        "pg_attribute".to_string(),
                    ))?
                    == "f";

                let primary = row
                    .try_get("primary")?
                    .ok_or(SnapshotClientError::MissingColumn(
                        "indisprimary".to_string(),
                        "pg_index".to_string(),
                    ))?
                    == "t";

                column_schemas.push(ColumnSchema::new(name, typ, modifier, nullable, primary))
            }
        }

        Ok(column_schemas)
    }

    /// Builds an executable statement for the dump query through `builder`.
    pub async fn prepare_with(
        &self,
        builder: &dyn StatementBuilder,
        sql: &str,
    ) -> Result<Statement, SnapshotClientError> {
        Ok(builder.build(&self.postgres_client, sql).await?)
    }

    /// Returns a forward-only stream over the rows of a prepared dump statement.
    pub async fn get_row_stream(
        &self,
        statement: &Statement,
    ) -> Result<RowStream, SnapshotClientError> {
        let params: Vec<&(dyn ToSql + Sync)> = vec![];
        let stream = self.postgres_client.query_raw(statement, params).await?;

        Ok(stream)
    }
}
