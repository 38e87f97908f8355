//! PostgreSQL schema model and connection utilities shared across crates.
//!
//! This crate provides the table/column schema types used when introspecting a
//! PostgreSQL database and the connection options for working with it through
//! the [`tokio-postgres`] crate.

pub mod schema;
pub mod tokio;
