use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

pub mod table_row;

/// A single typed value read out of a table row.
///
/// Each variant maps a PostgreSQL scalar type onto its Rust representation; `Null`
/// stands in for SQL `NULL` regardless of the column's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    String(String),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    TimeStamp(NaiveDateTime),
    TimeStampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Cell {
    /// Returns the integer value of this cell widened to an `i64`, or `None` for
    /// non-integer cells.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::I16(val) => Some(i64::from(*val)),
            Cell::I32(val) => Some(i64::from(*val)),
            Cell::I64(val) => Some(*val),
            _ => None,
        }
    }
}
