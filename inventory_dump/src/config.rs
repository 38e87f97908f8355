use std::collections::HashMap;
use std::fmt;

use postgres::schema::TableName;
use postgres::tokio::config::PgConnectionConfig;
use serde::{Deserialize, Serialize};
use tokio_postgres::config::SslMode;

use crate::position::PrimaryKeyPosition;

/// The kind of data source a [`DataSourceConfig`] describes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DataSourceKind {
    Standard,
    Sharded,
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceKind::Standard => write!(f, "standard"),
            DataSourceKind::Sharded => write!(f, "sharded"),
        }
    }
}

/// Configuration identifying the physical data source to dump from.
///
/// Only the `Standard` kind carries enough information to open a direct connection;
/// the dumper rejects every other kind at construction time.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceConfig {
    Standard {
        /// Host on which the database server is running
        host: String,

        /// Port on which the database server is listening
        port: u16,

        /// Database name
        name: String,

        /// Database user name
        username: String,

        /// Database user password. Sensitive and redacted in debug output
        password: Option<String>,
    },
    Sharded {
        /// Sharding rule describing how the logical source maps onto physical ones
        rule: String,
    },
}

impl DataSourceConfig {
    /// Returns the kind of data source this configuration describes.
    pub fn kind(&self) -> DataSourceKind {
        match self {
            DataSourceConfig::Standard { .. } => DataSourceKind::Standard,
            DataSourceConfig::Sharded { .. } => DataSourceKind::Sharded,
        }
    }

    /// Returns connection options for the configured database, or `None` when this
    /// kind of configuration does not describe a directly connectable source.
    pub fn connection_config(&self) -> Option<PgConnectionConfig> {
        match self {
            DataSourceConfig::Standard {
                host,
                port,
                name,
                username,
                password,
            } => Some(PgConnectionConfig {
                host: host.clone(),
                port: *port,
                name: name.clone(),
                username: username.clone(),
                password: password.clone(),
                ssl_mode: SslMode::Disable,
            }),
            DataSourceConfig::Sharded { .. } => None,
        }
    }
}

impl fmt::Debug for DataSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard {
                host,
                port,
                name,
                username,
                password: _,
            } => f
                .debug_struct("Standard")
                .field("host", host)
                .field("port", port)
                .field("name", name)
                .field("username", username)
                .field("password", &"REDACTED")
                .finish(),
            Self::Sharded { rule } => f.debug_struct("Sharded").field("rule", rule).finish(),
        }
    }
}

/// Immutable configuration of one inventory dump invocation.
#[derive(Debug, Clone)]
pub struct DumperConfig {
    /// The data source to dump from
    pub data_source: DataSourceConfig,
    /// Physical name of the table to dump
    pub table_name: TableName,
    /// Mapping from physical table names to the logical names records are tagged with
    pub table_name_map: HashMap<String, String>,
    /// Column bounding the scan; the whole table is dumped when absent
    pub primary_key: Option<String>,
    /// Row range to scan; required whenever `primary_key` is set
    pub position: Option<PrimaryKeyPosition>,
}

impl DumperConfig {
    /// Returns the logical name dumped records are tagged with.
    ///
    /// Falls back to the physical table name when no mapping is configured for it.
    pub fn logical_table_name(&self) -> &str {
        self.table_name_map
            .get(&self.table_name.name)
            .map(String::as_str)
            .unwrap_or(&self.table_name.name)
    }
}
