use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentRecord {
    pub acm_name: String,
    pub branch: String,
    pub calls_made: u64,
    pub ptp_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallEvent {
    pub date_actioned: NaiveDateTime,
    pub ptp_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    #[serde(rename = "acmname")]
    pub acm_name: String,
    #[serde(rename = "callsmade")]
    pub calls_made: u64,
    #[serde(rename = "ptpamount", with = "rust_decimal::serde::float")]
    pub ptp_amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyPoint {
    pub hour: u32,
    #[serde(rename = "ptpamount", with = "rust_decimal::serde::float")]
    pub ptp_amount: Decimal,
}

/// Field an agent ranking is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    CallsMade,
    PtpAmount,
}

impl Metric {
    pub fn heading(self) -> &'static str {
        match self {
            Metric::CallsMade => "Calls Made",
            Metric::PtpAmount => "PTP Amount",
        }
    }

    pub fn of_record(self, record: &AgentRecord) -> Decimal {
        match self {
            Metric::CallsMade => Decimal::from(record.calls_made),
            Metric::PtpAmount => record.ptp_amount,
        }
    }

    pub fn of_summary(self, summary: &AgentSummary) -> Decimal {
        match self {
            Metric::CallsMade => Decimal::from(summary.calls_made),
            Metric::PtpAmount => summary.ptp_amount,
        }
    }
}

/// Both source tables as loaded for one dashboard session.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub agents: Vec<AgentRecord>,
    pub events: Vec<CallEvent>,
}
