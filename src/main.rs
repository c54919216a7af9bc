use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod html;
mod loader;
mod metrics;
mod models;
mod report;
mod server;

use config::DashboardConfig;
use models::Metric;
use report::DashboardOptions;

#[derive(Parser)]
#[command(name = "acm-dashboard")]
#[command(about = "ACM hourly productivity dashboard for call-center collections", long_about = None)]
struct Cli {
    /// Workbook with the agent and call-log sheets, or a directory of CSV sheets
    #[arg(long, global = true, env = "ACM_WORKBOOK", default_value = config::DEFAULT_WORKBOOK)]
    workbook: PathBuf,
    #[arg(long, global = true, env = "ACM_AGENT_SHEET", default_value = config::DEFAULT_AGENT_SHEET)]
    agent_sheet: String,
    #[arg(long, global = true, env = "ACM_EVENT_SHEET", default_value = config::DEFAULT_EVENT_SHEET)]
    event_sheet: String,
    /// Rows taken from each end of the ranking
    #[arg(long, global = true, env = "ACM_TOP_N", default_value_t = config::DEFAULT_TOP_N)]
    top_n: usize,
    /// Reject columns outside the expected schema
    #[arg(long, global = true)]
    strict_schema: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Html,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Print overall metrics and the branch ranking
    Summary {
        #[arg(long)]
        branch: Option<String>,
        #[arg(long, value_enum, default_value_t = Metric::CallsMade)]
        rank_by: Metric,
    },
    /// Write the dashboard as an HTML page or a markdown report
    Report {
        #[arg(long)]
        branch: Option<String>,
        #[arg(long, value_enum, default_value_t = Metric::CallsMade)]
        rank_by: Metric,
        #[arg(long, value_enum, default_value_t = ReportFormat::Html)]
        format: ReportFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export the top and bottom ACM table as CSV
    Export {
        #[arg(long)]
        branch: Option<String>,
        #[arg(long, value_enum, default_value_t = Metric::CallsMade)]
        rank_by: Metric,
        #[arg(long, default_value = "top_bottom_acms.csv")]
        out: PathBuf,
    },
    /// Print PTP totals per hour of day
    Trend {
        /// Include hours without events as zero
        #[arg(long)]
        fill: bool,
    },
    /// Serve the dashboard over HTTP
    Serve {
        #[arg(long, env = "ACM_BIND_ADDR", default_value = config::DEFAULT_BIND_ADDR)]
        bind: String,
        /// Branch shown when the page is opened without a selection
        #[arg(long)]
        branch: Option<String>,
    },
}

impl Cli {
    fn config(&self) -> DashboardConfig {
        DashboardConfig {
            workbook: self.workbook.clone(),
            agent_sheet: self.agent_sheet.clone(),
            event_sheet: self.event_sheet.clone(),
            top_n: self.top_n,
            strict_schema: self.strict_schema,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config();
    let dataset = config.load_dataset()?;

    let options = |branch: Option<String>, rank_by: Metric| DashboardOptions {
        branch,
        rank_by,
        top_n: config.top_n,
    };

    match cli.command {
        Commands::Summary { branch, rank_by } => {
            let dashboard = report::build_dashboard(&dataset, &options(branch, rank_by))?;
            print!("{}", report::render_text(&dashboard));
        }
        Commands::Report {
            branch,
            rank_by,
            format,
            out,
        } => {
            let dashboard = report::build_dashboard(&dataset, &options(branch, rank_by))?;
            let (contents, default_out) = match format {
                ReportFormat::Html => (
                    html::render_dashboard(&dashboard, html::PageMode::Static),
                    "dashboard.html",
                ),
                ReportFormat::Markdown => (report::render_markdown(&dashboard), "dashboard.md"),
            };
            let out = out.unwrap_or_else(|| PathBuf::from(default_out));
            std::fs::write(&out, contents)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            branch,
            rank_by,
            out,
        } => {
            let dashboard = report::build_dashboard(&dataset, &options(branch, rank_by))?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            report::write_ranking_csv(&dashboard.ranking, file)?;
            println!(
                "Exported {} rows for branch {} to {}.",
                dashboard.ranking.len(),
                dashboard.selected_branch,
                out.display()
            );
        }
        Commands::Trend { fill } => {
            let trend = metrics::hourly_trend(&dataset.events);
            let trend = if fill {
                metrics::fill_missing_hours(&trend)
            } else {
                trend
            };
            print!("{}", report::render_trend(&trend));
        }
        Commands::Serve { bind, branch } => {
            let state = server::AppState {
                dataset,
                options: options(branch, Metric::CallsMade),
            };
            server::serve(&bind, state).await?;
        }
    }

    Ok(())
}
