use std::collections::BTreeMap;

use chrono::Timelike;
use rust_decimal::Decimal;

use crate::models::{AgentRecord, AgentSummary, CallEvent, HourlyPoint, Metric};

pub fn total_calls(records: &[AgentRecord]) -> u64 {
    records.iter().map(|record| record.calls_made).sum()
}

pub fn total_ptp(records: &[AgentRecord]) -> Decimal {
    records.iter().map(|record| record.ptp_amount).sum()
}

/// Branch values in the order they first appear.
pub fn distinct_branches(records: &[AgentRecord]) -> Vec<String> {
    let mut branches: Vec<String> = Vec::new();
    for record in records {
        if !branches.contains(&record.branch) {
            branches.push(record.branch.clone());
        }
    }
    branches
}

pub fn filter_branch(records: &[AgentRecord], branch: &str) -> Vec<AgentRecord> {
    records
        .iter()
        .filter(|record| record.branch == branch)
        .cloned()
        .collect()
}

/// Sums per agent, ordered by agent name.
pub fn summarize_by_agent(records: &[AgentRecord]) -> Vec<AgentSummary> {
    let mut map: BTreeMap<&str, (u64, Decimal)> = BTreeMap::new();

    for record in records {
        let entry = map.entry(record.acm_name.as_str()).or_insert((0, Decimal::ZERO));
        entry.0 += record.calls_made;
        entry.1 += record.ptp_amount;
    }

    map.into_iter()
        .map(|(acm_name, (calls_made, ptp_amount))| AgentSummary {
            acm_name: acm_name.to_string(),
            calls_made,
            ptp_amount,
        })
        .collect()
}

/// Agent holding the largest value; the earliest row wins a tie.
pub fn arg_max(records: &[AgentRecord], metric: Metric) -> Option<&str> {
    let mut best: Option<(&AgentRecord, Decimal)> = None;
    for record in records {
        let value = metric.of_record(record);
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((record, value)),
        }
    }
    best.map(|(record, _)| record.acm_name.as_str())
}

/// Agent holding the smallest value; the earliest row wins a tie.
pub fn arg_min(records: &[AgentRecord], metric: Metric) -> Option<&str> {
    let mut best: Option<(&AgentRecord, Decimal)> = None;
    for record in records {
        let value = metric.of_record(record);
        match best {
            Some((_, current)) if value >= current => {}
            _ => best = Some((record, value)),
        }
    }
    best.map(|(record, _)| record.acm_name.as_str())
}

pub fn top_n(summary: &[AgentSummary], metric: Metric, n: usize) -> Vec<AgentSummary> {
    let mut sorted = summary.to_vec();
    sorted.sort_by(|a, b| metric.of_summary(b).cmp(&metric.of_summary(a)));
    sorted.truncate(n);
    sorted
}

pub fn bottom_n(summary: &[AgentSummary], metric: Metric, n: usize) -> Vec<AgentSummary> {
    let mut sorted = summary.to_vec();
    sorted.sort_by(|a, b| metric.of_summary(a).cmp(&metric.of_summary(b)));
    sorted.truncate(n);
    sorted
}

/// Top `n` followed by bottom `n`. With fewer than `2n` agents the two
/// halves share rows.
pub fn ranking_table(summary: &[AgentSummary], metric: Metric, n: usize) -> Vec<AgentSummary> {
    let mut rows = top_n(summary, metric, n);
    rows.extend(bottom_n(summary, metric, n));
    rows
}

/// PTP totals per hour of day, ascending; hours without events are absent.
pub fn hourly_trend(events: &[CallEvent]) -> Vec<HourlyPoint> {
    let mut buckets: BTreeMap<u32, Decimal> = BTreeMap::new();
    for event in events {
        *buckets.entry(event.date_actioned.hour()).or_insert(Decimal::ZERO) += event.ptp_amount;
    }
    buckets
        .into_iter()
        .map(|(hour, ptp_amount)| HourlyPoint { hour, ptp_amount })
        .collect()
}

pub fn fill_missing_hours(trend: &[HourlyPoint]) -> Vec<HourlyPoint> {
    (0..24)
        .map(|hour| {
            trend
                .iter()
                .find(|point| point.hour == hour)
                .copied()
                .unwrap_or(HourlyPoint {
                    hour,
                    ptp_amount: Decimal::ZERO,
                })
        })
        .collect()
}
