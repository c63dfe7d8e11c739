use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::statistics::non_negative;
use super::ReportError;
use crate::config::ReportSchema;
use crate::store::{QueryExecutor, ResultRow, SqlValue};

/// Recorded nutrition status of a beneficiary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NutritionStatus {
    Normal,
    Underweight,
    SeverelyUnderweight,
    Stunting,
}

impl NutritionStatus {
    /// Case-insensitive; unknown labels yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "underweight" => Some(Self::Underweight),
            "severely_underweight" => Some(Self::SeverelyUnderweight),
            "stunting" => Some(Self::Stunting),
            _ => None,
        }
    }
}

/// Beneficiary counts per nutrition status. NULL or unknown labels land in
/// `unrecognized`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusDistribution {
    pub normal: u64,
    pub underweight: u64,
    pub severely_underweight: u64,
    pub stunting: u64,
    pub unrecognized: u64,
}

impl StatusDistribution {
    fn record(&mut self, status: Option<NutritionStatus>, count: u64) {
        let slot = match status {
            Some(NutritionStatus::Normal) => &mut self.normal,
            Some(NutritionStatus::Underweight) => &mut self.underweight,
            Some(NutritionStatus::SeverelyUnderweight) => &mut self.severely_underweight,
            Some(NutritionStatus::Stunting) => &mut self.stunting,
            None => &mut self.unrecognized,
        };
        *slot += count;
    }

    fn merge(&mut self, other: &Self) {
        self.normal += other.normal;
        self.underweight += other.underweight;
        self.severely_underweight += other.severely_underweight;
        self.stunting += other.stunting;
        self.unrecognized += other.unrecognized;
    }

    pub fn total(&self) -> u64 {
        self.normal + self.underweight + self.severely_underweight + self.stunting + self.unrecognized
    }

    /// Severely underweight plus stunting.
    pub fn critical(&self) -> u64 {
        self.severely_underweight + self.stunting
    }

    /// Critical cases as a percentage of all beneficiaries, one decimal place.
    /// Zero when there are no beneficiaries.
    pub fn critical_case_percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.critical() as f64 / total as f64 * 1000.0).round() / 10.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictBreakdown {
    /// `None` for beneficiaries with no district recorded.
    pub name: Option<String>,
    pub total_beneficiaries: u64,
    pub nutrition_status: StatusDistribution,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FacilityTypeCounts {
    pub puskesmas: u64,
    pub pustu: u64,
    pub other: u64,
}

/// Nutrition-status distribution, per-district split and facility mix,
/// optionally narrowed to one district.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownReport {
    pub district: Option<String>,
    pub total_beneficiaries: u64,
    pub nutrition_status: StatusDistribution,
    pub critical_cases: u64,
    pub critical_case_percentage: f64,
    pub districts: Vec<DistrictBreakdown>,
    pub facility_types: FacilityTypeCounts,
}

#[derive(Debug, Clone)]
pub struct BreakdownReporter {
    status_sql: String,
    facility_sql: String,
}

impl BreakdownReporter {
    pub fn new(schema: &ReportSchema) -> Self {
        let status_sql = format!(
            "SELECT {district} AS district, {status} AS status, COUNT(*) AS total \
             FROM {table} \
             WHERE ?1 IS NULL OR {district} = ?1 \
             GROUP BY {district}, {status} \
             ORDER BY {district} ASC",
            district = schema.beneficiary_district_column(),
            status = schema.beneficiary_status_column(),
            table = schema.beneficiary_table(),
        );
        let facility_sql = format!(
            "SELECT {kind} AS facility_type, COUNT(*) AS total \
             FROM {table} \
             WHERE ?1 IS NULL OR {district} = ?1 \
             GROUP BY {kind}",
            kind = schema.facility_type_column(),
            district = schema.facility_district_column(),
            table = schema.facility_table(),
        );
        Self {
            status_sql,
            facility_sql,
        }
    }

    /// A district that matches nothing yields an all-zero report.
    pub fn report<E>(
        &self,
        executor: &E,
        district: Option<&str>,
    ) -> Result<BreakdownReport, ReportError>
    where
        E: QueryExecutor + ?Sized,
    {
        let district = district.map(str::trim);
        if district == Some("") {
            return Err(ReportError::InvalidArgument(
                "district filter must not be empty".to_string(),
            ));
        }
        debug!(?district, "computing nutrition breakdown");

        let filter = [district.map_or(SqlValue::Null, SqlValue::from)];

        let mut per_district: BTreeMap<Option<String>, StatusDistribution> = BTreeMap::new();
        for row in executor.query(&self.status_sql, &filter)? {
            let name = row.optional_text("district")?.map(str::to_string);
            let status = row.optional_text("status")?.and_then(NutritionStatus::parse);
            per_district
                .entry(name)
                .or_default()
                .record(status, group_total(&row)?);
        }

        let mut facility_types = FacilityTypeCounts::default();
        for row in executor.query(&self.facility_sql, &filter)? {
            let total = group_total(&row)?;
            let kind = row
                .optional_text("facility_type")?
                .map(|kind| kind.trim().to_ascii_lowercase());
            match kind.as_deref() {
                Some("puskesmas") => facility_types.puskesmas += total,
                Some("pustu") => facility_types.pustu += total,
                _ => facility_types.other += total,
            }
        }

        let mut nutrition_status = StatusDistribution::default();
        let districts = per_district
            .into_iter()
            .map(|(name, distribution)| {
                nutrition_status.merge(&distribution);
                DistrictBreakdown {
                    name,
                    total_beneficiaries: distribution.total(),
                    nutrition_status: distribution,
                }
            })
            .collect();

        Ok(BreakdownReport {
            district: district.map(str::to_string),
            total_beneficiaries: nutrition_status.total(),
            critical_cases: nutrition_status.critical(),
            critical_case_percentage: nutrition_status.critical_case_percentage(),
            nutrition_status,
            districts,
            facility_types,
        })
    }
}

fn group_total(row: &ResultRow) -> Result<u64, ReportError> {
    Ok(non_negative("total", row.integer("total")?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{QueryError, ResultSet};
    use std::cell::RefCell;

    /// Answers status queries and facility queries from separate row sets.
    #[derive(Default)]
    struct Scripted {
        status_rows: ResultSet,
        facility_rows: ResultSet,
        params: RefCell<Vec<Vec<SqlValue>>>,
    }

    impl QueryExecutor for Scripted {
        fn query(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, QueryError> {
            self.params.borrow_mut().push(params.to_vec());
            if sql.contains("facility_type") {
                Ok(self.facility_rows.clone())
            } else {
                Ok(self.status_rows.clone())
            }
        }
    }

    fn status_row(district: Option<&str>, status: Option<&str>, total: i64) -> ResultRow {
        ResultRow::new(vec![
            ("district".to_string(), district.map_or(SqlValue::Null, SqlValue::from)),
            ("status".to_string(), status.map_or(SqlValue::Null, SqlValue::from)),
            ("total".to_string(), SqlValue::Integer(total)),
        ])
    }

    fn facility_row(kind: &str, total: i64) -> ResultRow {
        ResultRow::new(vec![
            ("facility_type".to_string(), SqlValue::from(kind)),
            ("total".to_string(), SqlValue::Integer(total)),
        ])
    }

    #[test]
    fn status_labels_parse_case_insensitively() {
        assert_eq!(NutritionStatus::parse(" Stunting "), Some(NutritionStatus::Stunting));
        assert_eq!(
            NutritionStatus::parse("SEVERELY_UNDERWEIGHT"),
            Some(NutritionStatus::SeverelyUnderweight)
        );
        assert_eq!(NutritionStatus::parse("gizi buruk"), None);
    }

    #[test]
    fn groups_are_folded_per_district_and_overall() {
        let reporter = BreakdownReporter::new(&ReportSchema::default());
        let executor = Scripted {
            status_rows: vec![
                status_row(Some("Coblong"), Some("normal"), 6),
                status_row(Some("Coblong"), Some("stunting"), 2),
                status_row(Some("Andir"), Some("severely_underweight"), 1),
                status_row(Some("Andir"), Some("unknown"), 1),
                status_row(None, None, 2),
            ],
            facility_rows: vec![
                facility_row("puskesmas", 2),
                facility_row("Pustu", 3),
                facility_row("klinik", 1),
            ],
            ..Scripted::default()
        };

        let report = reporter.report(&executor, None).expect("breakdown builds");

        assert_eq!(report.total_beneficiaries, 12);
        assert_eq!(report.critical_cases, 3);
        assert_eq!(report.critical_case_percentage, 25.0);
        assert_eq!(report.nutrition_status.unrecognized, 3);
        let names: Vec<Option<&str>> = report
            .districts
            .iter()
            .map(|district| district.name.as_deref())
            .collect();
        assert_eq!(names, [None, Some("Andir"), Some("Coblong")]);
        assert_eq!(report.districts[2].total_beneficiaries, 8);
        assert_eq!(
            report.facility_types,
            FacilityTypeCounts {
                puskesmas: 2,
                pustu: 3,
                other: 1
            }
        );
        assert!(executor
            .params
            .borrow()
            .iter()
            .all(|params| params == &vec![SqlValue::Null]));
    }

    #[test]
    fn district_filter_is_trimmed_and_bound() {
        let reporter = BreakdownReporter::new(&ReportSchema::default());
        let executor = Scripted::default();

        let report = reporter
            .report(&executor, Some("  Andir "))
            .expect("breakdown builds");

        assert_eq!(report.district.as_deref(), Some("Andir"));
        assert_eq!(report.total_beneficiaries, 0);
        assert_eq!(report.critical_case_percentage, 0.0);
        assert_eq!(executor.params.borrow()[0], vec![SqlValue::from("Andir")]);
    }

    #[test]
    fn blank_district_is_rejected_before_querying() {
        let reporter = BreakdownReporter::new(&ReportSchema::default());
        let executor = Scripted::default();

        assert!(matches!(
            reporter.report(&executor, Some("   ")),
            Err(ReportError::InvalidArgument(_))
        ));
        assert!(executor.params.borrow().is_empty());
    }

    #[test]
    fn percentage_rounds_to_one_decimal() {
        let distribution = StatusDistribution {
            normal: 2,
            stunting: 1,
            ..StatusDistribution::default()
        };
        assert_eq!(distribution.critical_case_percentage(), 33.3);
    }
}
