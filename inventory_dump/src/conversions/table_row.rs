use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

use super::Cell;

/// One result row converted into typed [`Cell`] values, in result-set column order.
#[derive(Debug)]
pub struct TableRow {
    pub values: Vec<Cell>,
}

#[derive(Debug, Error)]
pub enum RowConversionError {
    #[error("unsupported type {0}")]
    UnsupportedType(Type),

    #[error("row get error: {0}")]
    RowGet(#[from] tokio_postgres::Error),
}

/// A strategy for decoding column values out of a result row.
///
/// [`GenericRowConverter`] covers the common scalar types; a custom implementation can
/// override [`RowConverter::read_value`] to decode database-specific types the generic
/// converter rejects.
pub trait RowConverter: Send + Sync {
    /// Reads the value of the column at ordinal `i` from `row`.
    fn read_value(&self, row: &Row, i: usize) -> Result<Cell, RowConversionError>;

    /// Converts a full result row by reading every column in order.
    fn try_from(&self, row: &Row) -> Result<TableRow, RowConversionError> {
        let mut values = Vec::with_capacity(row.columns().len());
        for i in 0..row.columns().len() {
            let value = self.read_value(row, i)?;
            values.push(value);
        }

        Ok(TableRow { values })
    }
}

/// Decodes column values by the column's wire type, mapping SQL `NULL` to [`Cell::Null`].
pub struct GenericRowConverter;

impl GenericRowConverter {
    fn get_from_row<'a, T, F>(row: &'a Row, i: usize, f: F) -> Result<Cell, RowConversionError>
    where
        T: FromSql<'a>,
        F: FnOnce(T) -> Cell,
    {
        match row.try_get::<_, Option<T>>(i)? {
            Some(val) => Ok(f(val)),
            None => Ok(Cell::Null),
        }
    }
}

impl RowConverter for GenericRowConverter {
    fn read_value(&self, row: &Row, i: usize) -> Result<Cell, RowConversionError> {
        match *row.columns()[i].type_() {
            Type::BOOL => Self::get_from_row(row, i, |val: bool| Cell::Bool(val)),
            Type::CHAR | Type::BPCHAR | Type::VARCHAR | Type::NAME | Type::TEXT => {
                Self::get_from_row(row, i, |val: &str| Cell::String(val.to_string()))
            }
            Type::INT2 => Self::get_from_row(row, i, |val: i16| Cell::I16(val)),
            Type::INT4 => Self::get_from_row(row, i, |val: i32| Cell::I32(val)),
            Type::INT8 => Self::get_from_row(row, i, |val: i64| Cell::I64(val)),
            Type::FLOAT4 => Self::get_from_row(row, i, |val: f32| Cell::F32(val)),
            Type::FLOAT8 => Self::get_from_row(row, i, |val: f64| Cell::F64(val)),
            Type::BYTEA => Self::get_from_row(row, i, |val: Vec<u8>| Cell::Bytes(val)),
            Type::DATE => Self::get_from_row(row, i, |val: NaiveDate| Cell::Date(val)),
            Type::TIME => Self::get_from_row(row, i, |val: NaiveTime| Cell::Time(val)),
            Type::TIMESTAMP => {
                Self::get_from_row(row, i, |val: NaiveDateTime| Cell::TimeStamp(val))
            }
            Type::TIMESTAMPTZ => Self::get_from_row(row, i, |val: DateTime<FixedOffset>| {
                Cell::TimeStampTz(val.into())
            }),
            Type::JSON | Type::JSONB => {
                Self::get_from_row(row, i, |val: serde_json::Value| Cell::Json(val))
            }
            ref typ => Err(RowConversionError::UnsupportedType(typ.clone())),
        }
    }
}
