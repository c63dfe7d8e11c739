//! Query-execution capability consumed by the report components.
//!
//! Reports only ever see [`QueryExecutor`]; the SQLite-backed session in
//! [`sqlite`] is one implementation, tests provide others.

mod geometry;
pub mod sqlite;

pub use geometry::{normalize_geometry, GeometryError};
pub use sqlite::{SqliteSession, SqliteStore, StoreOptions};

/// A single scalar as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One result row: column names mapped to values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    columns: Vec<(String, SqlValue)>,
}

impl ResultRow {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    fn require(&self, column: &str) -> Result<&SqlValue, QueryError> {
        self.get(column)
            .ok_or_else(|| QueryError::MissingColumn(column.to_string()))
    }

    /// Integer column that may be NULL.
    pub fn optional_integer(&self, column: &str) -> Result<Option<i64>, QueryError> {
        match self.require(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(value) => Ok(Some(*value)),
            other => Err(QueryError::unexpected(column, "integer", other)),
        }
    }

    pub fn integer(&self, column: &str) -> Result<i64, QueryError> {
        self.optional_integer(column)?
            .ok_or_else(|| QueryError::unexpected(column, "integer", &SqlValue::Null))
    }

    pub fn optional_text(&self, column: &str) -> Result<Option<&str>, QueryError> {
        match self.require(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(value) => Ok(Some(value.as_str())),
            other => Err(QueryError::unexpected(column, "text", other)),
        }
    }

    pub fn text(&self, column: &str) -> Result<&str, QueryError> {
        self.optional_text(column)?
            .ok_or_else(|| QueryError::unexpected(column, "text", &SqlValue::Null))
    }
}

pub type ResultSet = Vec<ResultRow>;

/// Read-only access to a relational store with a GeoJSON conversion function.
pub trait QueryExecutor {
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, QueryError>;
}

impl<T: QueryExecutor + ?Sized> QueryExecutor for &T {
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, QueryError> {
        (**self).query(sql, params)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("query rejected: {0}")]
    Rejected(String),
    #[error("query exceeded the {0:?} timeout")]
    Timeout(std::time::Duration),
    #[error("result is missing column '{0}'")]
    MissingColumn(String),
    #[error("unexpected value in column '{column}': {detail}")]
    UnexpectedValue { column: String, detail: String },
    #[error("expected {expected} rows, store returned {found}")]
    UnexpectedRowCount { expected: String, found: usize },
}

impl QueryError {
    pub(crate) fn unexpected(column: &str, expected: &str, found: &SqlValue) -> Self {
        Self::UnexpectedValue {
            column: column.to_string(),
            detail: format!("expected {expected}, found {}", found.kind()),
        }
    }
}
