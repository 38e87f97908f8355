use std::fmt;

use pg_escape::quote_identifier;
use tokio_postgres::types::Type;

/// An object identifier in PostgreSQL.
pub type Oid = u32;

/// A schema-qualified PostgreSQL table name.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TableName {
    pub schema: String,
    pub name: String,
}

impl TableName {
    pub fn new(schema: String, name: String) -> TableName {
        Self { schema, name }
    }

    /// Renders the name for use in SQL text.
    ///
    /// Both parts are escaped according to PostgreSQL identifier quoting rules, so the
    /// result is safe to interpolate into a query.
    pub fn as_quoted_identifier(&self) -> String {
        let quoted_schema = quote_identifier(&self.schema);
        let quoted_name = quote_identifier(&self.name);
        format!("{quoted_schema}.{quoted_name}")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Type-specific attribute of a column, e.g. the declared length of a varchar.
type TypeModifier = i32;

/// The schema of a single column.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub typ: Type,
    pub modifier: TypeModifier,
    pub nullable: bool,
    /// Whether the column is part of the table's primary key
    pub primary: bool,
}

impl ColumnSchema {
    pub fn new(
        name: String,
        typ: Type,
        modifier: TypeModifier,
        nullable: bool,
        primary: bool,
    ) -> ColumnSchema {
        Self {
            name,
            typ,
            modifier,
            nullable,
            primary,
        }
    }
}

/// The schema of a table: its id, its name and its columns in ordinal order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TableSchema {
    /// The PostgreSQL OID of the table
    pub id: Oid,
    /// The fully qualified name of the table
    pub name: TableName,
    /// The schemas of all columns, in column order
    pub column_schemas: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(id: Oid, name: TableName, column_schemas: Vec<ColumnSchema>) -> Self {
        Self {
            id,
            name,
            column_schemas,
        }
    }

    /// Returns whether any column is part of a primary key.
    pub fn has_primary_keys(&self) -> bool {
        self.column_schemas.iter().any(|cs| cs.primary)
    }

    /// Returns whether the column at `ordinal` is part of the table's primary key.
    ///
    /// Ordinals follow the order of [`Self::column_schemas`]; an out-of-range ordinal
    /// is reported as not part of the key.
    pub fn is_primary_key(&self, ordinal: usize) -> bool {
        self.column_schemas
            .get(ordinal)
            .map(|cs| cs.primary)
            .unwrap_or(false)
    }
}
