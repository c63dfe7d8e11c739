//! Read-only nutrition-intervention reports.
//!
//! Every report is stateless: each call queries the executor it is handed
//! and shapes the rows it gets back.

mod breakdown;
mod priority;
mod statistics;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ReportSchema;
use crate::store::{QueryError, QueryExecutor};

pub use breakdown::{
    BreakdownReport, BreakdownReporter, DistrictBreakdown, FacilityTypeCounts, NutritionStatus,
    StatusDistribution,
};
pub use priority::{PriorityRegionRanker, RankLimit, RankedRegion, DEFAULT_LIMIT};
pub use statistics::{AggregateReport, AggregateStatisticsReporter};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("query failed: {0}")]
    QueryFailure(#[from] QueryError),
}

/// Both reports taken one after the other.
#[derive(Debug, Clone, Serialize)]
pub struct PrioritySnapshot {
    pub generated_at: DateTime<Utc>,
    pub limit: i64,
    pub priority_regions: Vec<RankedRegion>,
    pub statistics: AggregateReport,
}

/// Report components bound to one schema.
#[derive(Debug, Clone)]
pub struct PriorityReports {
    ranker: PriorityRegionRanker,
    statistics: AggregateStatisticsReporter,
    breakdown: BreakdownReporter,
}

impl PriorityReports {
    pub fn new(schema: &ReportSchema) -> Self {
        Self {
            ranker: PriorityRegionRanker::new(schema),
            statistics: AggregateStatisticsReporter::new(schema),
            breakdown: BreakdownReporter::new(schema),
        }
    }

    pub fn priority_regions<E>(
        &self,
        executor: &E,
        limit: i64,
    ) -> Result<Vec<RankedRegion>, ReportError>
    where
        E: QueryExecutor + ?Sized,
    {
        self.ranker.rank(executor, limit)
    }

    pub fn statistics<E>(&self, executor: &E) -> Result<AggregateReport, ReportError>
    where
        E: QueryExecutor + ?Sized,
    {
        self.statistics.report(executor)
    }

    pub fn breakdown<E>(
        &self,
        executor: &E,
        district: Option<&str>,
    ) -> Result<BreakdownReport, ReportError>
    where
        E: QueryExecutor + ?Sized,
    {
        self.breakdown.report(executor, district)
    }

    /// Runs the ranker, then the aggregate reporter. Stops at the first failure.
    pub fn snapshot<E>(&self, executor: &E, limit: i64) -> Result<PrioritySnapshot, ReportError>
    where
        E: QueryExecutor + ?Sized,
    {
        let priority_regions = self.priority_regions(executor, limit)?;
        let statistics = self.statistics(executor)?;
        Ok(PrioritySnapshot {
            generated_at: Utc::now(),
            limit,
            priority_regions,
            statistics,
        })
    }
}
