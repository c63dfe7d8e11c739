use crate::render::{
    render_breakdown, render_priority_regions, render_snapshot, render_statistics, OutputFormat,
};
use clap::Args;
use nutrition_priority::config::AppConfig;
use nutrition_priority::error::AppError;
use nutrition_priority::reports::PriorityReports;
use nutrition_priority::store::SqliteStore;
use nutrition_priority::telemetry;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct OutputArgs {
    /// SQLite database to query (overrides NUTRITION_DATABASE_PATH)
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RankArgs {
    /// Number of regions to rank (defaults to NUTRITION_DEFAULT_LIMIT)
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) limit: Option<i64>,
    #[command(flatten)]
    pub(crate) output: OutputArgs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReportKind {
    Snapshot,
    PriorityRegions,
    Statistics,
    Breakdown { district: Option<String> },
}

impl ReportKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Snapshot => "combined",
            Self::PriorityRegions => "priority regions",
            Self::Statistics => "statistics",
            Self::Breakdown { .. } => "breakdown",
        }
    }

    /// Whether the report is a single table and so has a CSV form.
    fn is_tabular(&self) -> bool {
        matches!(self, Self::PriorityRegions | Self::Statistics)
    }
}

pub(crate) fn run_report(args: RankArgs, kind: ReportKind) -> Result<(), AppError> {
    let RankArgs { limit, output } = args;
    let mut config = AppConfig::load()?;
    if let Some(path) = output.database {
        config.store.database_path = path;
    }

    telemetry::init(&config.telemetry)?;

    let store = SqliteStore::from_config(&config.store);
    let reports = PriorityReports::new(&config.schema);
    let limit = limit.unwrap_or(config.default_limit);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_report(&store, &reports, &kind, limit, output.format, &mut out)?;
    out.flush()?;

    info!(?kind, path = %store.path().display(), "report rendered");
    Ok(())
}

/// Acquires one session for the whole command; it is released on every return path.
pub(crate) fn write_report<W: Write>(
    store: &SqliteStore,
    reports: &PriorityReports,
    kind: &ReportKind,
    limit: i64,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), AppError> {
    if format == OutputFormat::Csv && !kind.is_tabular() {
        return Err(AppError::UnsupportedFormat {
            report: kind.name(),
            format: "csv",
        });
    }

    let session = store
        .session()
        .map_err(nutrition_priority::reports::ReportError::from)?;

    match kind {
        ReportKind::Snapshot => {
            let snapshot = reports.snapshot(&session, limit)?;
            render_snapshot(out, &snapshot, format)
        }
        ReportKind::PriorityRegions => {
            let regions = reports.priority_regions(&session, limit)?;
            render_priority_regions(out, &regions, format)
        }
        ReportKind::Statistics => {
            let statistics = reports.statistics(&session)?;
            render_statistics(out, &statistics, format)
        }
        ReportKind::Breakdown { district } => {
            let breakdown = reports.breakdown(&session, district.as_deref())?;
            render_breakdown(out, &breakdown, format)
        }
    }
}
