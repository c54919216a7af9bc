use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use crate::loader::{self, LoadOptions};
use crate::models::Dataset;

pub const DEFAULT_WORKBOOK: &str = "callsmade.xlsx";
pub const DEFAULT_AGENT_SHEET: &str = "Sheet1";
pub const DEFAULT_EVENT_SHEET: &str = "Sheet2";
pub const DEFAULT_TOP_N: usize = 3;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";

/// Settings shared by every command, resolved from flags and `ACM_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Workbook file, or a directory of `<sheet>.csv` files.
    pub workbook: PathBuf,
    pub agent_sheet: String,
    pub event_sheet: String,
    pub top_n: usize,
    pub strict_schema: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            workbook: PathBuf::from(DEFAULT_WORKBOOK),
            agent_sheet: DEFAULT_AGENT_SHEET.to_string(),
            event_sheet: DEFAULT_EVENT_SHEET.to_string(),
            top_n: DEFAULT_TOP_N,
            strict_schema: false,
        }
    }
}

impl DashboardConfig {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            agent_sheet: self.agent_sheet.clone(),
            event_sheet: self.event_sheet.clone(),
            strict_schema: self.strict_schema,
        }
    }

    pub fn load_dataset(&self) -> anyhow::Result<Dataset> {
        info!(
            workbook = %self.workbook.display(),
            agent_sheet = %self.agent_sheet,
            event_sheet = %self.event_sheet,
            "loading dataset"
        );
        let mut source = loader::open_source(&self.workbook)
            .with_context(|| format!("failed to open {}", self.workbook.display()))?;
        let dataset = loader::load_dataset(source.as_mut(), &self.load_options())
            .with_context(|| format!("failed to load {}", self.workbook.display()))?;
        Ok(dataset)
    }
}
