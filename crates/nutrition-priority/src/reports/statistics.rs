use serde::Serialize;
use tracing::debug;

use super::ReportError;
use crate::config::ReportSchema;
use crate::store::{QueryError, QueryExecutor, ResultRow};

/// Single-row summary across beneficiaries, facilities and regions.
///
/// `total_severity` mirrors SQL `SUM`: it is `None` when there are no regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    pub total_beneficiaries: u64,
    pub total_facilities: u64,
    pub total_regions: u64,
    pub total_severity: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AggregateStatisticsReporter {
    sql: String,
}

impl AggregateStatisticsReporter {
    pub fn new(schema: &ReportSchema) -> Self {
        let sql = format!(
            "SELECT \
             (SELECT COUNT(*) FROM {beneficiaries}) AS total_beneficiaries, \
             (SELECT COUNT(*) FROM {facilities}) AS total_facilities, \
             (SELECT COUNT(*) FROM {regions}) AS total_regions, \
             (SELECT SUM({severity}) FROM {regions}) AS total_severity",
            beneficiaries = schema.beneficiary_table(),
            facilities = schema.facility_table(),
            regions = schema.region_table(),
            severity = schema.severity_column(),
        );
        Self { sql }
    }

    pub fn report<E>(&self, executor: &E) -> Result<AggregateReport, ReportError>
    where
        E: QueryExecutor + ?Sized,
    {
        debug!("computing aggregate statistics");
        let rows = executor.query(&self.sql, &[])?;
        let row = match rows.as_slice() {
            [row] => row,
            _ => {
                return Err(QueryError::UnexpectedRowCount {
                    expected: "exactly 1".to_string(),
                    found: rows.len(),
                }
                .into())
            }
        };

        Ok(AggregateReport {
            total_beneficiaries: count(row, "total_beneficiaries")?,
            total_facilities: count(row, "total_facilities")?,
            total_regions: count(row, "total_regions")?,
            total_severity: row
                .optional_integer("total_severity")?
                .map(|sum| non_negative("total_severity", sum))
                .transpose()?,
        })
    }
}

fn count(row: &ResultRow, column: &str) -> Result<u64, QueryError> {
    non_negative(column, row.integer(column)?)
}

pub(super) fn non_negative(column: &str, value: i64) -> Result<u64, QueryError> {
    u64::try_from(value).map_err(|_| QueryError::UnexpectedValue {
        column: column.to_string(),
        detail: format!("expected a non-negative total, found {value}"),
    })
}
