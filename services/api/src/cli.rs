use crate::report::{run_report, RankArgs, ReportKind};
use crate::server;
use clap::{Args, Parser, Subcommand};
use nutrition_priority::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Nutrition Priority Reports",
    about = "Rank stunting-priority regions and summarise nutrition-intervention coverage",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the priority regions followed by the aggregate statistics
    Report(RankArgs),
    /// Print only the top-N regions by stunting count
    Regions(RankArgs),
    /// Print only the aggregate statistics
    Statistics(StatisticsArgs),
    /// Print nutrition-status, per-district and facility-type counts
    Breakdown(BreakdownArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
struct StatisticsArgs {
    #[command(flatten)]
    output: crate::report::OutputArgs,
}

#[derive(Args, Debug)]
struct BreakdownArgs {
    /// Restrict the breakdown to one district
    #[arg(long)]
    district: Option<String>,
    #[command(flatten)]
    output: crate::report::OutputArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report(args) => run_report(args, ReportKind::Snapshot),
        Command::Regions(args) => run_report(args, ReportKind::PriorityRegions),
        Command::Statistics(StatisticsArgs { output }) => run_report(
            RankArgs {
                limit: None,
                output,
            },
            ReportKind::Statistics,
        ),
        Command::Breakdown(BreakdownArgs { district, output }) => run_report(
            RankArgs {
                limit: None,
                output,
            },
            ReportKind::Breakdown { district },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::OutputFormat;

    #[test]
    fn negative_limits_reach_the_ranker() {
        let cli = Cli::try_parse_from(["nutrition-priority", "regions", "--limit", "-2"])
            .expect("negative limit parses");

        match cli.command {
            Some(Command::Regions(args)) => assert_eq!(args.limit, Some(-2)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn report_accepts_format_and_database() {
        let cli = Cli::try_parse_from([
            "nutrition-priority",
            "report",
            "--format",
            "json",
            "--database",
            "gizi.db",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Report(args)) => {
                assert_eq!(args.output.format, OutputFormat::Json);
                assert_eq!(
                    args.output.database.as_deref(),
                    Some(std::path::Path::new("gizi.db"))
                );
                assert_eq!(args.limit, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn breakdown_takes_optional_district() {
        let cli = Cli::try_parse_from(["nutrition-priority", "breakdown", "--district", "Andir"])
            .expect("arguments parse");

        match cli.command {
            Some(Command::Breakdown(args)) => {
                assert_eq!(args.district.as_deref(), Some("Andir"));
                assert_eq!(args.output.format, OutputFormat::Text);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
