use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::ReportError;
use crate::config::ReportSchema;
use crate::store::{normalize_geometry, QueryError, QueryExecutor, SqlValue};

pub const DEFAULT_LIMIT: i64 = 5;

/// Validated number of regions to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankLimit(i64);

impl RankLimit {
    pub fn new(value: i64) -> Result<Self, ReportError> {
        if value <= 0 {
            return Err(ReportError::InvalidArgument(format!(
                "limit must be a positive integer, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

/// One row of the ranked region list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRegion {
    pub name: String,
    pub severity_count: u64,
    pub geometry: Option<Value>,
}

/// Selects the regions with the highest severity count.
#[derive(Debug, Clone)]
pub struct PriorityRegionRanker {
    sql: String,
}

impl PriorityRegionRanker {
    pub fn new(schema: &ReportSchema) -> Self {
        let sql = format!(
            "SELECT {name} AS name, {severity} AS severity_count, \
             ST_AsGeoJSON({geometry}) AS geometry \
             FROM {table} \
             ORDER BY {severity} DESC, {name} ASC \
             LIMIT ?1",
            name = schema.region_name_column(),
            severity = schema.severity_column(),
            geometry = schema.geometry_column(),
            table = schema.region_table(),
        );
        Self { sql }
    }

    pub fn rank<E>(&self, executor: &E, limit: i64) -> Result<Vec<RankedRegion>, ReportError>
    where
        E: QueryExecutor + ?Sized,
    {
        let limit = RankLimit::new(limit)?;
        debug!(limit = limit.get(), "ranking priority regions");

        let rows = executor.query(&self.sql, &[SqlValue::Integer(limit.get())])?;
        if rows.len() as u64 > limit.get() as u64 {
            return Err(QueryError::UnexpectedRowCount {
                expected: format!("at most {}", limit.get()),
                found: rows.len(),
            }
            .into());
        }

        let mut regions = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = row.text("name")?.to_string();
            let severity = row.integer("severity_count")?;
            let severity_count = u64::try_from(severity).map_err(|_| {
                QueryError::UnexpectedValue {
                    column: "severity_count".to_string(),
                    detail: format!("region '{name}' has negative severity {severity}"),
                }
            })?;
            let geometry = row
                .optional_text("geometry")?
                .map(|raw| {
                    normalize_geometry(raw).map_err(|err| QueryError::UnexpectedValue {
                        column: "geometry".to_string(),
                        detail: format!("region '{name}': {err}"),
                    })
                })
                .transpose()?;

            regions.push(RankedRegion {
                name,
                severity_count,
                geometry,
            });
        }

        Ok(regions)
    }
}
