use crate::conversions::Cell;
use crate::position::DumpPosition;

/// The kind of change a record represents.
///
/// An inventory dump models every row it reads as an `Insert`; the remaining variants
/// are produced by the incremental capture stages sharing this record model.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

/// A single column of a dumped row.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// The name of the column
    pub name: String,
    /// The value read from the row
    pub value: Cell,
    /// Whether the value carries new data; always true for snapshot rows
    pub updated: bool,
    /// Whether the column is part of the table's primary key
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: String, value: Cell, updated: bool, primary_key: bool) -> Column {
        Self {
            name,
            value,
            updated,
            primary_key,
        }
    }
}

/// One dumped row, tagged with its progress position and logical table name.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    /// Progress marker of the scan after this row
    pub position: DumpPosition,
    /// The change this record models
    pub change_type: ChangeType,
    /// Logical name of the table this row belongs to
    pub table_name: String,
    /// Column values in result-set order
    pub columns: Vec<Column>,
}

impl DataRecord {
    pub fn new(
        position: DumpPosition,
        change_type: ChangeType,
        table_name: String,
        columns: Vec<Column>,
    ) -> DataRecord {
        Self {
            position,
            change_type,
            table_name,
            columns,
        }
    }
}

/// Stream-termination marker.
///
/// The carried position tells the consumer whether the stream finished cleanly
/// ([`DumpPosition::Finished`]) or was cut short ([`DumpPosition::Placeholder`]).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FinishedRecord {
    pub position: DumpPosition,
}

impl FinishedRecord {
    /// Marker for a scan that ran to completion.
    pub fn finished() -> FinishedRecord {
        Self {
            position: DumpPosition::Finished,
        }
    }

    /// End-of-stream marker carrying no resume information.
    pub fn placeholder() -> FinishedRecord {
        Self {
            position: DumpPosition::Placeholder,
        }
    }
}

/// A record pushed from the dumper to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Data(DataRecord),
    Finished(FinishedRecord),
}
