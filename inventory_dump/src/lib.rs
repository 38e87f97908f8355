pub mod channel;
pub mod clients;
pub mod config;
pub mod conversions;
pub mod dumper;
pub mod lifecycle;
pub mod position;
pub mod record;
pub mod sources;

// re-export tokio_postgres so that implementers of the StatementBuilder & RowConverter
// traits can use its types
pub use tokio_postgres;
