use clap::ValueEnum;
use nutrition_priority::error::AppError;
use nutrition_priority::reports::{
    AggregateReport, BreakdownReport, PrioritySnapshot, RankedRegion, StatusDistribution,
};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
    /// Single-table reports only.
    Csv,
}

pub(crate) fn render_priority_regions<W: Write>(
    out: &mut W,
    regions: &[RankedRegion],
    format: OutputFormat,
) -> Result<(), AppError> {
    match format {
        OutputFormat::Text => write_region_table(out, regions),
        OutputFormat::Json => write_json(out, regions),
        OutputFormat::Csv => write_region_csv(out, regions),
    }
}

pub(crate) fn render_statistics<W: Write>(
    out: &mut W,
    report: &AggregateReport,
    format: OutputFormat,
) -> Result<(), AppError> {
    match format {
        OutputFormat::Text => write_statistics_list(out, report),
        OutputFormat::Json => write_json(out, report),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.serialize(report)?;
            writer.flush()?;
            Ok(())
        }
    }
}

pub(crate) fn render_snapshot<W: Write>(
    out: &mut W,
    snapshot: &PrioritySnapshot,
    format: OutputFormat,
) -> Result<(), AppError> {
    match format {
        OutputFormat::Json => write_json(out, snapshot),
        OutputFormat::Text => {
            writeln!(
                out,
                "Nutrition priority report (generated {})\n",
                snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
            )?;
            write_region_table(out, &snapshot.priority_regions)?;
            writeln!(out)?;
            write_statistics_list(out, &snapshot.statistics)
        }
        OutputFormat::Csv => Err(AppError::UnsupportedFormat {
            report: "combined",
            format: "csv",
        }),
    }
}

pub(crate) fn render_breakdown<W: Write>(
    out: &mut W,
    report: &BreakdownReport,
    format: OutputFormat,
) -> Result<(), AppError> {
    match format {
        OutputFormat::Json => write_json(out, report),
        OutputFormat::Text => write_breakdown_list(out, report),
        OutputFormat::Csv => Err(AppError::UnsupportedFormat {
            report: "breakdown",
            format: "csv",
        }),
    }
}

fn write_json<W: Write, T: serde::Serialize + ?Sized>(
    out: &mut W,
    value: &T,
) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

fn write_region_table<W: Write>(out: &mut W, regions: &[RankedRegion]) -> Result<(), AppError> {
    writeln!(out, "Priority regions")?;
    if regions.is_empty() {
        writeln!(out, "(no regions recorded)")?;
        return Ok(());
    }

    let name_width = regions
        .iter()
        .map(|region| region.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("region".len());

    writeln!(
        out,
        "{:<4}  {:<name_width$}  {:>8}  geometry",
        "rank", "region", "severity"
    )?;
    for (index, region) in regions.iter().enumerate() {
        writeln!(
            out,
            "{:<4}  {:<name_width$}  {:>8}  {}",
            index + 1,
            region.name,
            region.severity_count,
            geometry_label(region)
        )?;
    }
    Ok(())
}

fn geometry_label(region: &RankedRegion) -> &str {
    region
        .geometry
        .as_ref()
        .and_then(|geometry| geometry.get("type"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("none")
}

fn write_region_csv<W: Write>(out: &mut W, regions: &[RankedRegion]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["name", "severity_count", "geometry"])?;
    for region in regions {
        let geometry = region
            .geometry
            .as_ref()
            .map(serde_json::Value::to_string)
            .unwrap_or_default();
        writer.write_record([
            region.name.as_str(),
            region.severity_count.to_string().as_str(),
            geometry.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_statistics_list<W: Write>(out: &mut W, report: &AggregateReport) -> Result<(), AppError> {
    let total_severity = report
        .total_severity
        .map(|sum| sum.to_string())
        .unwrap_or_else(|| "n/a (no regions)".to_string());

    writeln!(out, "Aggregate statistics")?;
    writeln!(out, "- Beneficiaries: {}", report.total_beneficiaries)?;
    writeln!(out, "- Health facilities: {}", report.total_facilities)?;
    writeln!(out, "- Regions: {}", report.total_regions)?;
    writeln!(out, "- Total stunting cases: {total_severity}")?;
    Ok(())
}

fn write_breakdown_list<W: Write>(out: &mut W, report: &BreakdownReport) -> Result<(), AppError> {
    let scope = report.district.as_deref().unwrap_or("all districts");
    writeln!(out, "Nutrition breakdown ({scope})")?;
    writeln!(out, "- Beneficiaries: {}", report.total_beneficiaries)?;
    write_distribution(out, "  ", &report.nutrition_status)?;
    writeln!(
        out,
        "- Critical cases: {} ({:.1}%)",
        report.critical_cases, report.critical_case_percentage
    )?;
    writeln!(
        out,
        "- Facilities: {} puskesmas, {} pustu, {} other",
        report.facility_types.puskesmas, report.facility_types.pustu, report.facility_types.other
    )?;

    writeln!(out, "\nBy district")?;
    if report.districts.is_empty() {
        writeln!(out, "(no beneficiaries recorded)")?;
    }
    for district in &report.districts {
        writeln!(
            out,
            "- {}: {}",
            district.name.as_deref().unwrap_or("(unassigned)"),
            district.total_beneficiaries
        )?;
        write_distribution(out, "    ", &district.nutrition_status)?;
    }
    Ok(())
}

fn write_distribution<W: Write>(
    out: &mut W,
    indent: &str,
    distribution: &StatusDistribution,
) -> Result<(), AppError> {
    writeln!(
        out,
        "{indent}normal {}, underweight {}, severely underweight {}, stunting {}, unrecognized {}",
        distribution.normal,
        distribution.underweight,
        distribution.severely_underweight,
        distribution.stunting,
        distribution.unrecognized
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn regions() -> Vec<RankedRegion> {
        vec![
            RankedRegion {
                name: "Coblong".to_string(),
                severity_count: 10,
                geometry: Some(json!({
                    "type": "Polygon",
                    "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]
                })),
            },
            RankedRegion {
                name: "Bojongloa".to_string(),
                severity_count: 7,
                geometry: None,
            },
        ]
    }

    fn rendered(write: impl FnOnce(&mut Vec<u8>) -> Result<(), AppError>) -> String {
        let mut buffer = Vec::new();
        write(&mut buffer).expect("render succeeds");
        String::from_utf8(buffer).expect("utf-8 output")
    }

    #[test]
    fn text_table_ranks_regions() {
        let output = rendered(|out| render_priority_regions(out, &regions(), OutputFormat::Text));
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "Priority regions");
        assert!(lines[2].starts_with("1     Coblong"));
        assert!(lines[2].ends_with("Polygon"));
        assert!(lines[3].starts_with("2     Bojongloa"));
        assert!(lines[3].ends_with("none"));
    }

    #[test]
    fn csv_keeps_empty_geometry_field() {
        let output = rendered(|out| render_priority_regions(out, &regions(), OutputFormat::Csv));
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "name,severity_count,geometry");
        assert!(lines[1].starts_with("Coblong,10,\"{"));
        assert_eq!(lines[2], "Bojongloa,7,");
    }

    #[test]
    fn statistics_show_missing_sum_explicitly() {
        let report = AggregateReport {
            total_beneficiaries: 0,
            total_facilities: 0,
            total_regions: 0,
            total_severity: None,
        };

        let text = rendered(|out| render_statistics(out, &report, OutputFormat::Text));
        assert!(text.contains("- Total stunting cases: n/a (no regions)"));

        let csv = rendered(|out| render_statistics(out, &report, OutputFormat::Csv));
        assert_eq!(
            csv,
            "total_beneficiaries,total_facilities,total_regions,total_severity\n0,0,0,\n"
        );

        let json = rendered(|out| render_statistics(out, &report, OutputFormat::Json));
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert!(value["total_severity"].is_null());
    }

    #[test]
    fn multi_table_reports_refuse_csv() {
        let report = BreakdownReport {
            district: None,
            total_beneficiaries: 0,
            nutrition_status: StatusDistribution::default(),
            critical_cases: 0,
            critical_case_percentage: 0.0,
            districts: Vec::new(),
            facility_types: Default::default(),
        };

        let mut buffer = Vec::new();
        let result = render_breakdown(&mut buffer, &report, OutputFormat::Csv);

        assert!(matches!(
            result,
            Err(AppError::UnsupportedFormat {
                report: "breakdown",
                ..
            })
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn breakdown_text_lists_districts() {
        let report = BreakdownReport {
            district: Some("Andir".to_string()),
            total_beneficiaries: 3,
            nutrition_status: StatusDistribution {
                normal: 1,
                severely_underweight: 1,
                stunting: 1,
                ..StatusDistribution::default()
            },
            critical_cases: 2,
            critical_case_percentage: 66.7,
            districts: vec![nutrition_priority::reports::DistrictBreakdown {
                name: Some("Andir".to_string()),
                total_beneficiaries: 3,
                nutrition_status: StatusDistribution::default(),
            }],
            facility_types: Default::default(),
        };

        let text = rendered(|out| render_breakdown(out, &report, OutputFormat::Text));

        assert!(text.starts_with("Nutrition breakdown (Andir)"));
        assert!(text.contains("- Critical cases: 2 (66.7%)"));
        assert!(text.contains("- Andir: 3"));
    }
}
