//! Self-contained HTML rendering of a [`Dashboard`].
//!
//! The page carries its own CSS; the heatmap is an HTML table with inline
//! cell colours and the hourly trend is an inline SVG line chart, so the
//! output works offline as a single file.

use std::fmt::Write;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{AgentSummary, HourlyPoint};
use crate::report::{format_amount, format_count, format_plain, Dashboard, TITLE};

const CHART_WIDTH: f64 = 960.0;
const CHART_HEIGHT: f64 = 420.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const GRID_LINES: usize = 5;

// coolwarm endpoints and midpoint
const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

/// How the branch selector is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Served page: the selector submits back to the server.
    Interactive,
    /// Written file: the selector is shown but cannot change anything.
    Static,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn render_dashboard(dashboard: &Dashboard, mode: PageMode) -> String {
    let heading = dashboard.rank_by.heading();
    let body = format!(
        r#"<aside class="sidebar">
    {metrics}
    {selector}
</aside>
<main>
    <h1>{title}</h1>
    <p class="extreme">Top ACM by {heading}: <strong>{top}</strong></p>
    <p class="extreme">Bottom ACM by {heading}: <strong>{bottom}</strong></p>
    <div class="columns">
        <section>
            <h2>Top {n} and Bottom {n} ACMs by Calls Made &amp; PTP Amount</h2>
            {table}
        </section>
        <section>
            <h2>Heatmap of Top and Bottom ACMs</h2>
            {heatmap}
        </section>
    </div>
    <section>
        <h2>Hourly Trend of PTP Amount Collected</h2>
        <p class="note">Covers call events from all branches.</p>
        {chart}
    </section>
</main>"#,
        metrics = render_metrics(dashboard),
        selector = render_selector(dashboard, mode),
        title = TITLE,
        heading = heading,
        top = escape_html(&dashboard.top_acm),
        bottom = escape_html(&dashboard.bottom_acm),
        n = dashboard.top_n,
        table = render_ranking_table(&dashboard.ranking),
        heatmap = render_heatmap(&dashboard.ranking),
        chart = render_trend_chart(&dashboard.hourly_trend),
    );
    wrap_page(&body)
}

/// Page shown when a dashboard cannot be computed, e.g. an empty branch.
pub fn render_error_page(message: &str) -> String {
    let body = format!(
        r#"<main>
    <h1>{TITLE}</h1>
    <div class="error">{}</div>
    <p><a href="/">Back to the dashboard</a></p>
</main>"#,
        escape_html(message)
    );
    wrap_page(&body)
}

fn wrap_page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{TITLE}</title>
    <style>{css}</style>
</head>
<body>
{body}
</body>
</html>"#,
        css = inline_css(),
    )
}

fn render_metrics(dashboard: &Dashboard) -> String {
    format!(
        r#"<h3>Overall Performance Metrics</h3>
    <div class="metric"><span class="label">Total Calls Made</span><span class="value">{}</span></div>
    <div class="metric"><span class="label">Total PTP Amount</span><span class="value">{}</span></div>"#,
        format_count(dashboard.total_calls),
        format_amount(dashboard.total_ptp)
    )
}

fn render_selector(dashboard: &Dashboard, mode: PageMode) -> String {
    let mut options = String::new();
    for branch in &dashboard.branches {
        let selected = if *branch == dashboard.selected_branch {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            options,
            r#"<option value="{value}"{selected}>{value}</option>"#,
            value = escape_html(branch)
        );
    }

    match mode {
        PageMode::Interactive => format!(
            r#"<form method="get" action="/">
        <label for="branch">Select Branch</label>
        <select id="branch" name="branch" onchange="this.form.submit()">{options}</select>
        <noscript><button type="submit">Apply</button></noscript>
    </form>"#
        ),
        PageMode::Static => format!(
            r#"<label for="branch">Select Branch</label>
    <select id="branch" disabled>{options}</select>"#
        ),
    }
}

fn render_ranking_table(rows: &[AgentSummary]) -> String {
    let mut body = String::new();
    for row in rows {
        let _ = write!(
            body,
            "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
            escape_html(&row.acm_name),
            row.calls_made,
            format_plain(row.ptp_amount)
        );
    }
    format!(
        r#"<table class="ranking">
        <thead><tr><th>acmname</th><th>callsmade</th><th>ptpamount</th></tr></thead>
        <tbody>{body}</tbody>
    </table>"#
    )
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Colour for `t` in `[0, 1]` on a diverging blue-white-red scale.
pub fn coolwarm(t: f64) -> (u8, u8, u8) {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
    let (start, end, local) = if t < 0.5 {
        (COLD, NEUTRAL, t * 2.0)
    } else {
        (NEUTRAL, WARM, (t - 0.5) * 2.0)
    };
    (
        lerp(start.0, end.0, local).round() as u8,
        lerp(start.1, end.1, local).round() as u8,
        lerp(start.2, end.2, local).round() as u8,
    )
}

fn as_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// One colour scale spans the whole matrix, both columns included.
fn render_heatmap(rows: &[AgentSummary]) -> String {
    if rows.is_empty() {
        return "<p class=\"note\">No ACMs to display.</p>".to_string();
    }

    let values: Vec<[f64; 2]> = rows
        .iter()
        .map(|row| [row.calls_made as f64, as_f64(row.ptp_amount)])
        .collect();
    let min = values.iter().flatten().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    let mut body = String::new();
    for (row, cells) in rows.iter().zip(&values) {
        let _ = write!(body, "<tr><th>{}</th>", escape_html(&row.acm_name));
        let labels = [row.calls_made.to_string(), format_plain(row.ptp_amount)];
        for (value, label) in cells.iter().zip(labels) {
            let t = if span > 0.0 { (value - min) / span } else { 0.5 };
            let (r, g, b) = coolwarm(t);
            let ink = if (0.2..=0.8).contains(&t) { "#111827" } else { "#ffffff" };
            let _ = write!(
                body,
                r#"<td style="background: rgb({r}, {g}, {b}); color: {ink}">{label}</td>"#
            );
        }
        body.push_str("</tr>");
    }

    format!(
        r#"<table class="heatmap">
        <thead><tr><th>acmname</th><th>callsmade</th><th>ptpamount</th></tr></thead>
        <tbody>{body}</tbody>
    </table>"#
    )
}

pub fn render_trend_chart(trend: &[HourlyPoint]) -> String {
    if trend.is_empty() {
        return "<p class=\"note\">No call events recorded.</p>".to_string();
    }

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let first_hour = trend.iter().map(|p| p.hour).min().unwrap_or(0) as f64;
    let last_hour = trend.iter().map(|p| p.hour).max().unwrap_or(23) as f64;
    let (x_min, x_max) = if last_hour > first_hour {
        (first_hour, last_hour)
    } else {
        (first_hour - 1.0, last_hour + 1.0)
    };
    let y_max = trend
        .iter()
        .map(|p| as_f64(p.ptp_amount))
        .fold(0.0, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let x_of = |hour: f64| MARGIN_LEFT + (hour - x_min) / (x_max - x_min) * plot_width;
    let y_of = |value: f64| MARGIN_TOP + plot_height - value / y_max * plot_height;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg class="trend" viewBox="0 0 {CHART_WIDTH} {CHART_HEIGHT}" role="img" aria-label="Hourly Trend of PTP Amount Collected">"#
    );
    let _ = write!(
        svg,
        r#"<text x="{}" y="28" text-anchor="middle" class="chart-title">Hourly Trend of PTP Amount Collected</text>"#,
        CHART_WIDTH / 2.0
    );

    for step in 0..=GRID_LINES {
        let value = y_max * step as f64 / GRID_LINES as f64;
        let y = y_of(value);
        let _ = write!(
            svg,
            r##"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#9ca3af" stroke-dasharray="6 4" stroke-opacity="0.7"/><text x="{:.1}" y="{:.1}" text-anchor="end" class="tick">{}</text>"##,
            MARGIN_LEFT + plot_width,
            MARGIN_LEFT - 8.0,
            y + 4.0,
            format_amount(Decimal::from_f64_retain(value).unwrap_or_default().round_dp(0))
        );
    }

    let mut hour = x_min.ceil() as i64;
    while hour as f64 <= x_max {
        if (0..24).contains(&hour) {
            let _ = write!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" class="tick">{hour}</text>"#,
                x_of(hour as f64),
                MARGIN_TOP + plot_height + 20.0
            );
        }
        hour += 1;
    }

    let points: Vec<String> = trend
        .iter()
        .map(|p| format!("{:.1},{:.1}", x_of(p.hour as f64), y_of(as_f64(p.ptp_amount))))
        .collect();
    let _ = write!(
        svg,
        r##"<polyline fill="none" stroke="#16a34a" stroke-width="2.5" points="{}"/>"##,
        points.join(" ")
    );
    for p in trend {
        let _ = write!(
            svg,
            r##"<circle cx="{:.1}" cy="{:.1}" r="5" fill="#16a34a"><title>{:02}:00 {}</title></circle>"##,
            x_of(p.hour as f64),
            y_of(as_f64(p.ptp_amount)),
            p.hour,
            format_amount(p.ptp_amount)
        );
    }

    let _ = write!(
        svg,
        r#"<line x1="{MARGIN_LEFT}" y1="{bottom:.1}" x2="{right:.1}" y2="{bottom:.1}" class="axis"/><line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{bottom:.1}" class="axis"/>"#,
        bottom = MARGIN_TOP + plot_height,
        right = MARGIN_LEFT + plot_width,
    );
    let _ = write!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" class="axis-label">Hour of the Day</text><text x="20" y="{:.1}" text-anchor="middle" class="axis-label" transform="rotate(-90 20 {:.1})">Total PTP Amount</text>"#,
        MARGIN_LEFT + plot_width / 2.0,
        CHART_HEIGHT - 12.0,
        MARGIN_TOP + plot_height / 2.0,
        MARGIN_TOP + plot_height / 2.0,
    );
    svg.push_str("</svg>");
    svg
}

fn inline_css() -> &'static str {
    r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body {
    font-family: system-ui, -apple-system, 'Segoe UI', sans-serif;
    color: #111827;
    background: #ffffff;
    display: flex;
    min-height: 100vh;
}
.sidebar {
    width: 280px;
    background: #f3f4f6;
    padding: 1.5rem;
    border-right: 1px solid #e5e7eb;
}
.sidebar h3 { font-size: 1rem; margin-bottom: 1rem; }
.metric { margin-bottom: 1.25rem; }
.metric .label { display: block; font-size: 0.875rem; color: #6b7280; }
.metric .value { display: block; font-size: 1.75rem; font-weight: 700; }
.sidebar label { display: block; font-size: 0.875rem; margin: 1rem 0 0.25rem; }
.sidebar select { width: 100%; padding: 0.4rem; }
main { flex: 1; padding: 2rem; }
main h1 { font-size: 2rem; margin-bottom: 1rem; }
main h2 { font-size: 1.1rem; margin: 1.5rem 0 0.75rem; }
.extreme { margin-bottom: 0.25rem; }
.columns { display: grid; grid-template-columns: 1fr 1fr; gap: 2rem; }
table { border-collapse: collapse; width: 100%; font-size: 0.9rem; }
th, td { padding: 0.4rem 0.75rem; border: 1px solid #e5e7eb; text-align: left; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
.heatmap td { text-align: center; border: 2px solid #ffffff; }
.note { color: #6b7280; font-size: 0.85rem; margin-bottom: 0.5rem; }
.error {
    background: #fef2f2;
    border-left: 4px solid #dc2626;
    color: #991b1b;
    padding: 1rem;
    margin: 1rem 0;
}
svg.trend { width: 100%; max-width: 960px; height: auto; }
svg .chart-title { font-size: 18px; font-weight: 600; }
svg .tick { font-size: 12px; fill: #4b5563; }
svg .axis { stroke: #374151; stroke-width: 1; }
svg .axis-label { font-size: 14px; fill: #111827; }
"#
}
