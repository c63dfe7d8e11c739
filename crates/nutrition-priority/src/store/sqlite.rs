use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode, OpenFlags};
use tracing::debug;

use super::geometry::normalize_geometry;
use super::{QueryError, QueryExecutor, ResultRow, ResultSet, SqlValue};
use crate::config::StoreConfig;

/// Number of virtual machine steps between deadline checks.
const PROGRESS_STEPS: i32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

/// Handle to an SQLite database holding the region, beneficiary and facility
/// tables. Holds no connection itself; each [`SqliteStore::session`] opens one.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    options: StoreOptions,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>, options: StoreOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.database_path.clone(),
            StoreOptions {
                timeout: config.timeout,
            },
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a read-only session. The connection closes when the session drops.
    pub fn session(&self) -> Result<SqliteSession, QueryError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI;
        let conn = Connection::open_with_flags(&self.path, flags).map_err(|err| {
            QueryError::Unavailable(format!("{}: {err}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "opened store session");
        SqliteSession::attach(conn, &self.options)
    }
}

/// A live, query-only connection implementing [`QueryExecutor`].
pub struct SqliteSession {
    conn: Connection,
    timeout: Duration,
}

impl SqliteSession {
    /// Wrap an existing connection: switches it to query-only mode, installs
    /// the busy timeout and registers `ST_AsGeoJSON`.
    pub fn attach(conn: Connection, options: &StoreOptions) -> Result<Self, QueryError> {
        let setup = |conn: &Connection| -> rusqlite::Result<()> {
            conn.busy_timeout(options.timeout)?;
            conn.pragma_update(None, "query_only", true)?;
            conn.create_scalar_function(
                "ST_AsGeoJSON",
                1,
                FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
                |ctx| {
                    let raw: Option<String> = ctx.get(0)?;
                    raw.map(|text| {
                        normalize_geometry(&text)
                            .map(|geometry| geometry.to_string())
                            .map_err(|err| rusqlite::Error::UserFunctionError(Box::new(err)))
                    })
                    .transpose()
                },
            )
        };
        setup(&conn).map_err(|err| QueryError::Unavailable(err.to_string()))?;

        Ok(Self {
            conn,
            timeout: options.timeout,
        })
    }

    fn run(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, QueryError> {
        let fail = |err: rusqlite::Error| self.classify(err);
        let mut stmt = self.conn.prepare(sql).map_err(fail)?;
        if !stmt.readonly() {
            return Err(QueryError::Rejected(
                "only read-only statements may be executed".to_string(),
            ));
        }

        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let bound: Vec<Value> = params.iter().map(to_sqlite).collect();
        let mut rows = stmt.query(params_from_iter(bound.iter())).map_err(fail)?;

        let mut result = ResultSet::new();
        while let Some(row) = rows.next().map_err(fail)? {
            let mut columns = Vec::with_capacity(names.len());
            for (index, name) in names.iter().enumerate() {
                let value = match row.get_ref(index).map_err(fail)? {
                    ValueRef::Null => SqlValue::Null,
                    ValueRef::Integer(value) => SqlValue::Integer(value),
                    ValueRef::Real(value) => SqlValue::Real(value),
                    ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
                        Ok(text) => SqlValue::Text(text.to_string()),
                        Err(err) => {
                            return Err(QueryError::UnexpectedValue {
                                column: name.clone(),
                                detail: format!("text is not valid UTF-8: {err}"),
                            })
                        }
                    },
                    ValueRef::Blob(_) => {
                        return Err(QueryError::UnexpectedValue {
                            column: name.clone(),
                            detail: "binary values are not supported".to_string(),
                        })
                    }
                };
                columns.push((name.clone(), value));
            }
            result.push(ResultRow::new(columns));
        }

        Ok(result)
    }

    fn classify(&self, err: rusqlite::Error) -> QueryError {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                ErrorCode::OperationInterrupted => QueryError::Timeout(self.timeout),
                ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked => QueryError::Unavailable(err.to_string()),
                _ => QueryError::Rejected(err.to_string()),
            },
            _ => QueryError::Rejected(err.to_string()),
        }
    }
}

impl QueryExecutor for SqliteSession {
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, QueryError> {
        let deadline = Instant::now() + self.timeout;
        self.conn
            .progress_handler(PROGRESS_STEPS, Some(move || Instant::now() >= deadline));

        debug!(sql, params = params.len(), "executing query");
        let outcome = self.run(sql, params);
        self.conn.progress_handler(0, None::<fn() -> bool>);

        let rows = outcome?;
        debug!(rows = rows.len(), "query complete");
        Ok(rows)
    }
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => Value::Integer(*value),
        SqlValue::Real(value) => Value::Real(*value),
        SqlValue::Text(value) => Value::Text(value.clone()),
    }
}
