use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Sheet '{sheet}' not found in {source_name}")]
    SheetNotFound { sheet: String, source_name: String },

    #[error("Column '{column}' not found in sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    #[error("Column 'branches' not found in the dataset.")]
    BranchColumnMissing,

    #[error("Column '{column}' appears more than once in sheet '{sheet}'")]
    DuplicateColumn { sheet: String, column: String },

    #[error("Unexpected column '{column}' in sheet '{sheet}'")]
    UnknownColumn { sheet: String, column: String },

    #[error("Sheet '{sheet}' row {row}: column '{column}' has invalid value '{value}' ({reason})")]
    InvalidNumber {
        sheet: String,
        row: usize,
        column: String,
        value: String,
        reason: &'static str,
    },

    #[error("Sheet '{sheet}' row {row}: cannot parse '{value}' as a date-time")]
    InvalidTimestamp {
        sheet: String,
        row: usize,
        value: String,
    },

    #[error("No ACM rows found for branch '{branch}'")]
    EmptySelection { branch: String },
}

pub type DashboardResult<T> = Result<T, DashboardError>;
