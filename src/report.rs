use std::fmt::Write;
use std::io;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::debug;

use crate::error::{DashboardError, DashboardResult};
use crate::metrics;
use crate::models::{AgentSummary, Dataset, HourlyPoint, Metric};

pub const TITLE: &str = "ACM Hourly Productivity Dashboard";

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    /// Branch to inspect; the first branch in the sheet when unset.
    pub branch: Option<String>,
    pub rank_by: Metric,
    pub top_n: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            branch: None,
            rank_by: Metric::CallsMade,
            top_n: 3,
        }
    }
}

/// One computed view over the dataset. Totals and the hourly trend cover
/// every branch; the ranking fields cover `selected_branch` only.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_calls: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_ptp: Decimal,
    pub branches: Vec<String>,
    pub selected_branch: String,
    pub rank_by: Metric,
    pub top_n: usize,
    pub top_acm: String,
    pub bottom_acm: String,
    pub ranking: Vec<AgentSummary>,
    pub hourly_trend: Vec<HourlyPoint>,
}

pub fn build_dashboard(dataset: &Dataset, options: &DashboardOptions) -> DashboardResult<Dashboard> {
    let total_calls = metrics::total_calls(&dataset.agents);
    let total_ptp = metrics::total_ptp(&dataset.agents);
    let branches = metrics::distinct_branches(&dataset.agents);

    let selected_branch = options
        .branch
        .clone()
        .or_else(|| branches.first().cloned())
        .unwrap_or_default();
    let filtered = metrics::filter_branch(&dataset.agents, &selected_branch);
    let empty = || DashboardError::EmptySelection {
        branch: selected_branch.clone(),
    };
    let top_acm = metrics::arg_max(&filtered, options.rank_by).ok_or_else(empty)?.to_string();
    let bottom_acm = metrics::arg_min(&filtered, options.rank_by).ok_or_else(empty)?.to_string();

    let summary = metrics::summarize_by_agent(&filtered);
    let ranking = metrics::ranking_table(&summary, options.rank_by, options.top_n);
    let hourly_trend = metrics::hourly_trend(&dataset.events);
    debug!(
        branch = %selected_branch,
        rows = filtered.len(),
        agents = summary.len(),
        hours = hourly_trend.len(),
        "computed dashboard"
    );

    Ok(Dashboard {
        total_calls,
        total_ptp,
        branches,
        selected_branch,
        rank_by: options.rank_by,
        top_n: options.top_n,
        top_acm,
        bottom_acm,
        ranking,
        hourly_trend,
    })
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// `12345` → `12,345`.
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Two decimals with thousands separators, `1234567.891` → `1,234,567.89`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{}.{fraction}", group_thousands(whole))
}

/// Shortest plain form, `150.50` → `150.5`.
pub fn format_plain(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn render_text(dashboard: &Dashboard) -> String {
    let mut output = String::new();
    let top_n = dashboard.top_n;
    let heading = dashboard.rank_by.heading();

    let _ = writeln!(output, "Overall Performance Metrics");
    let _ = writeln!(output, "  Total Calls Made: {}", format_count(dashboard.total_calls));
    let _ = writeln!(output, "  Total PTP Amount: {}", format_amount(dashboard.total_ptp));
    let _ = writeln!(output);
    let _ = writeln!(output, "Branch: {}", dashboard.selected_branch);
    let _ = writeln!(output, "Top ACM by {}: {}", heading, dashboard.top_acm);
    let _ = writeln!(output, "Bottom ACM by {}: {}", heading, dashboard.bottom_acm);
    let _ = writeln!(output);
    let _ = writeln!(output, "Top {top_n} and Bottom {top_n} ACMs by {heading}:");
    for row in &dashboard.ranking {
        let _ = writeln!(
            output,
            "- {} calls {} PTP {}",
            row.acm_name,
            format_count(row.calls_made),
            format_amount(row.ptp_amount)
        );
    }

    output
}

pub fn render_markdown(dashboard: &Dashboard) -> String {
    let mut output = String::new();
    let top_n = dashboard.top_n;
    let heading = dashboard.rank_by.heading();

    let _ = writeln!(output, "# {TITLE}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall Performance Metrics");
    let _ = writeln!(output, "- Total Calls Made: {}", format_count(dashboard.total_calls));
    let _ = writeln!(output, "- Total PTP Amount: {}", format_amount(dashboard.total_ptp));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Branch {}", dashboard.selected_branch);
    let _ = writeln!(output, "Top ACM by {}: {}", heading, dashboard.top_acm);
    let _ = writeln!(output);
    let _ = writeln!(output, "Bottom ACM by {}: {}", heading, dashboard.bottom_acm);
    let _ = writeln!(output);
    let _ = writeln!(output, "### Top {top_n} and Bottom {top_n} ACMs by Calls Made & PTP Amount");
    let _ = writeln!(output, "| ACM | Calls Made | PTP Amount |");
    let _ = writeln!(output, "|-----|-----------:|-----------:|");
    for row in &dashboard.ranking {
        let _ = writeln!(
            output,
            "| {} | {} | {} |",
            row.acm_name.replace('|', "\\|"),
            format_count(row.calls_made),
            format_amount(row.ptp_amount)
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Hourly Trend of PTP Amount (all branches)");

    if dashboard.hourly_trend.is_empty() {
        let _ = writeln!(output, "No call events recorded.");
    } else {
        for point in &dashboard.hourly_trend {
            let _ = writeln!(output, "- {:02}:00 {}", point.hour, format_amount(point.ptp_amount));
        }
    }

    output
}

pub fn render_trend(trend: &[HourlyPoint]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Hourly Trend of PTP Amount Collected (all branches)");
    if trend.is_empty() {
        let _ = writeln!(output, "No call events recorded.");
    }
    for point in trend {
        let _ = writeln!(output, "{:02}:00  {:>16}", point.hour, format_amount(point.ptp_amount));
    }
    output
}

pub fn write_ranking_csv<W: io::Write>(ranking: &[AgentSummary], writer: W) -> DashboardResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in ranking {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
