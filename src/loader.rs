//! Reading the agent and call-log sheets into typed records.
//!
//! Sources hand back a [`RawTable`] of loosely typed cells; the typed
//! parsers then resolve a fixed column schema against the normalised
//! header row and coerce every required cell, failing on the first value
//! that does not fit.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use calamine::{open_workbook_auto, Data, DataType, Reader, Sheets};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{DashboardError, DashboardResult};
use crate::models::{AgentRecord, CallEvent, Dataset};

pub const AGENT_COLUMNS: [&str; 4] = ["acmname", "branches", "callsmade", "ptpamount"];
pub const EVENT_COLUMNS: [&str; 2] = ["dateactioned", "ptpamount"];

const TIMESTAMP_FORMATS: [&str; 10] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// 9999-12-31, the last date a spreadsheet can hold.
const MAX_EXCEL_SERIAL: f64 = 2_958_466.0;

// Caps keep every column sum far inside u64 and Decimal range.
const MAX_CALLS: u64 = u32::MAX as u64;
// 1e15
const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x38D7E, 0, false, 0);

static EMPTY_CELL: Cell = Cell::Empty;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form of the cell as it would be shown in a spreadsheet.
    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.trim().to_string(),
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", *value as i64)
            }
            Cell::Number(value) => value.to_string(),
            Cell::DateTime(value) => value.to_string(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => Cell::Empty,
            Data::Int(v) => Cell::Number(*v as f64),
            Data::Float(v) => Cell::Number(*v),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::DateTime(dt) => value
                .as_datetime()
                .map(Cell::DateTime)
                .unwrap_or(Cell::Number(dt.as_f64())),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// A sheet as read from its source, header row included.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: String,
    /// 1-based spreadsheet row holding the headers.
    pub header_row: usize,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            header_row: 1,
            headers,
            rows,
        }
    }
}

pub trait TableSource {
    fn describe(&self) -> String;
    fn read_table(&mut self, sheet: &str) -> DashboardResult<RawTable>;
}

pub struct WorkbookSource {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl WorkbookSource {
    pub fn open(path: &Path) -> DashboardResult<Self> {
        let workbook = open_workbook_auto(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            workbook,
        })
    }
}

impl TableSource for WorkbookSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_table(&mut self, sheet: &str) -> DashboardResult<RawTable> {
        if !self.workbook.sheet_names().iter().any(|name| name == sheet) {
            return Err(DashboardError::SheetNotFound {
                sheet: sheet.to_string(),
                source_name: self.describe(),
            });
        }

        let range = self.workbook.worksheet_range(sheet)?;
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|cells| cells.iter().map(|cell| Cell::from(cell).display()).collect())
            .unwrap_or_default();
        let rows: Vec<Vec<Cell>> = rows
            .map(|cells| cells.iter().map(Cell::from).collect())
            .collect();

        Ok(RawTable {
            name: sheet.to_string(),
            header_row: first_row + 1,
            headers,
            rows,
        })
    }
}

/// A directory holding one `<sheet>.csv` per sheet.
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

impl TableSource for CsvDirectorySource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn read_table(&mut self, sheet: &str) -> DashboardResult<RawTable> {
        let path = self.dir.join(format!("{sheet}.csv"));
        if !path.is_file() {
            return Err(DashboardError::SheetNotFound {
                sheet: sheet.to_string(),
                source_name: self.describe(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.trim().is_empty() {
                            Cell::Empty
                        } else {
                            Cell::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }

        Ok(RawTable::new(sheet, headers, rows))
    }
}

/// Picks the source kind from the path: directories are read as CSV sheets,
/// anything else as a workbook.
pub fn open_source(path: &Path) -> DashboardResult<Box<dyn TableSource>> {
    if path.is_dir() {
        return Ok(Box::new(CsvDirectorySource::new(path)));
    }
    if !path.exists() {
        return Err(DashboardError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }
    Ok(Box::new(WorkbookSource::open(path)?))
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub agent_sheet: String,
    pub event_sheet: String,
    pub strict_schema: bool,
}

pub fn load_dataset(source: &mut dyn TableSource, options: &LoadOptions) -> DashboardResult<Dataset> {
    let agent_table = source.read_table(&options.agent_sheet)?;
    let event_table = source.read_table(&options.event_sheet)?;

    let agents = parse_agents(&agent_table, options.strict_schema)?;
    let events = parse_events(&event_table, options.strict_schema)?;
    info!(
        source = %source.describe(),
        agents = agents.len(),
        events = events.len(),
        "loaded dataset"
    );

    Ok(Dataset { agents, events })
}

pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Resolves each required column to its position in the header row.
fn resolve_columns<const N: usize>(
    table: &RawTable,
    required: [&str; N],
    strict: bool,
) -> DashboardResult<[usize; N]> {
    let normalized: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();

    for (idx, name) in normalized.iter().enumerate() {
        if name.is_empty() {
            continue;
        }
        if normalized[..idx].contains(name) {
            return Err(DashboardError::DuplicateColumn {
                sheet: table.name.clone(),
                column: name.clone(),
            });
        }
        if !required.contains(&name.as_str()) {
            if strict {
                return Err(DashboardError::UnknownColumn {
                    sheet: table.name.clone(),
                    column: name.clone(),
                });
            }
            debug!(sheet = %table.name, column = %name, "ignoring column");
        }
    }

    let mut positions = [0usize; N];
    for (slot, column) in positions.iter_mut().zip(required) {
        *slot = match normalized.iter().position(|name| name == column) {
            Some(pos) => pos,
            None if column == "branches" => return Err(DashboardError::BranchColumnMissing),
            None => {
                return Err(DashboardError::MissingColumn {
                    sheet: table.name.clone(),
                    column: column.to_string(),
                })
            }
        };
    }
    Ok(positions)
}

fn data_rows(table: &RawTable) -> impl Iterator<Item = (usize, &Vec<Cell>)> + '_ {
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !row.iter().all(Cell::is_empty))
        .map(move |(idx, row)| (table.header_row + idx + 1, row))
}

fn cell_at(row: &[Cell], idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&EMPTY_CELL)
}

pub fn parse_agents(table: &RawTable, strict: bool) -> DashboardResult<Vec<AgentRecord>> {
    let [name_idx, branch_idx, calls_idx, ptp_idx] = resolve_columns(table, AGENT_COLUMNS, strict)?;

    let mut records = Vec::new();
    for (row_number, row) in data_rows(table) {
        let calls_made = parse_count(cell_at(row, calls_idx))
            .map_err(|reason| invalid_number(table, row_number, "callsmade", cell_at(row, calls_idx), reason))?;
        let ptp_amount = parse_amount(cell_at(row, ptp_idx))
            .map_err(|reason| invalid_number(table, row_number, "ptpamount", cell_at(row, ptp_idx), reason))?;

        records.push(AgentRecord {
            acm_name: cell_at(row, name_idx).display(),
            branch: cell_at(row, branch_idx).display(),
            calls_made,
            ptp_amount,
        });
    }
    Ok(records)
}

pub fn parse_events(table: &RawTable, strict: bool) -> DashboardResult<Vec<CallEvent>> {
    let [date_idx, ptp_idx] = resolve_columns(table, EVENT_COLUMNS, strict)?;

    let mut events = Vec::new();
    for (row_number, row) in data_rows(table) {
        let date_cell = cell_at(row, date_idx);
        let date_actioned = parse_timestamp(date_cell).ok_or_else(|| DashboardError::InvalidTimestamp {
            sheet: table.name.clone(),
            row: row_number,
            value: date_cell.display(),
        })?;
        let ptp_amount = parse_amount(cell_at(row, ptp_idx))
            .map_err(|reason| invalid_number(table, row_number, "ptpamount", cell_at(row, ptp_idx), reason))?;

        events.push(CallEvent {
            date_actioned,
            ptp_amount,
        });
    }
    Ok(events)
}

fn invalid_number(
    table: &RawTable,
    row: usize,
    column: &str,
    cell: &Cell,
    reason: &'static str,
) -> DashboardError {
    DashboardError::InvalidNumber {
        sheet: table.name.clone(),
        row,
        column: column.to_string(),
        value: cell.display(),
        reason,
    }
}

fn parse_count(cell: &Cell) -> Result<u64, &'static str> {
    let value = parse_amount(cell)?;
    if !value.fract().is_zero() {
        return Err("not a whole number");
    }
    value
        .to_u64()
        .filter(|calls| *calls <= MAX_CALLS)
        .ok_or("out of range")
}

fn parse_amount(cell: &Cell) -> Result<Decimal, &'static str> {
    let value = match cell {
        Cell::Empty => return Err("missing value"),
        Cell::Number(v) if !v.is_finite() => return Err("not numeric"),
        Cell::Number(v) => Decimal::from_f64(*v).ok_or("out of range")?,
        Cell::Text(text) => {
            let text = text.trim();
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .map_err(|_| "not numeric")?
        }
        Cell::DateTime(_) => return Err("not numeric"),
    };
    if value.is_sign_negative() && !value.is_zero() {
        return Err("negative");
    }
    if value > MAX_AMOUNT {
        return Err("out of range");
    }
    Ok(value)
}

pub fn parse_timestamp(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(value) => Some(*value),
        Cell::Number(serial) => excel_serial_to_datetime(*serial),
        Cell::Text(text) => parse_timestamp_text(text.trim()),
        Cell::Empty => None,
    }
}

fn parse_timestamp_text(text: &str) -> Option<NaiveDateTime> {
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Some(value.naive_local());
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(text, format) {
            return Some(value);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Days since 1899-12-30, fractional part being the time of day.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::try_seconds(seconds)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};
    use chrono::Timelike;
    use rust_xlsxwriter::{Format, Workbook};
    use std::io::Write;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn agent_table(headers: &[&str], rows: Vec<Vec<Cell>>) -> RawTable {
        RawTable::new(
            "Sheet1",
            headers.iter().map(|h| h.to_string()).collect(),
            rows,
        )
    }

    #[test]
    fn headers_are_trimmed_and_lowercased() {
        assert_eq!(normalize_header(" CallsMade "), "callsmade");
        assert_eq!(normalize_header("callsmade"), "callsmade");
    }

    #[test]
    fn parses_agents_with_messy_headers() {
        let table = agent_table(
            &[" ACMName", "Branches ", " CallsMade ", "PTPAmount"],
            vec![
                vec![text("Avery"), text("North"), Cell::Number(12.0), Cell::Number(150.5)],
                vec![text("Jules"), Cell::Number(101.0), text("7"), text("20.25")],
            ],
        );

        let records = parse_agents(&table, false).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].acm_name, "Avery");
        assert_eq!(records[0].calls_made, 12);
        assert_eq!(records[0].ptp_amount, Decimal::new(1505, 1));
        assert_eq!(records[1].branch, "101");
        assert_eq!(records[1].calls_made, 7);
        assert_eq!(records[1].ptp_amount, Decimal::new(2025, 2));
    }

    #[test]
    fn column_order_does_not_matter() {
        let table = agent_table(
            &["ptpamount", "callsmade", "acmname", "branches"],
            vec![vec![text("10"), text("3"), text("Kiara"), text("East")]],
        );

        let records = parse_agents(&table, false).unwrap();
        assert_eq!(records[0].acm_name, "Kiara");
        assert_eq!(records[0].branch, "East");
        assert_eq!(records[0].calls_made, 3);
    }

    #[test]
    fn missing_branch_column_has_dedicated_error() {
        let table = agent_table(&["acmname", "callsmade", "ptpamount"], vec![]);
        let err = parse_agents(&table, false).unwrap_err();
        assert!(matches!(err, DashboardError::BranchColumnMissing));
        assert_eq!(err.to_string(), "Column 'branches' not found in the dataset.");
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let table = agent_table(&["acmname", "branches", "ptpamount"], vec![]);
        match parse_agents(&table, false).unwrap_err() {
            DashboardError::MissingColumn { column, .. } => assert_eq!(column, "callsmade"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_normalized_headers_are_rejected() {
        let table = agent_table(&["acmname", "branches", "CallsMade", " callsmade", "ptpamount"], vec![]);
        assert!(matches!(
            parse_agents(&table, false).unwrap_err(),
            DashboardError::DuplicateColumn { .. }
        ));
    }

    #[test]
    fn unknown_columns_only_fail_in_strict_mode() {
        let table = agent_table(
            &["acmname", "branches", "callsmade", "ptpamount", "region"],
            vec![vec![text("Avery"), text("North"), text("1"), text("2"), text("West")]],
        );
        assert_eq!(parse_agents(&table, false).unwrap().len(), 1);
        match parse_agents(&table, true).unwrap_err() {
            DashboardError::UnknownColumn { column, .. } => assert_eq!(column, "region"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_calls_are_fatal_with_location() {
        let table = agent_table(
            &["acmname", "branches", "callsmade", "ptpamount"],
            vec![
                vec![text("Avery"), text("North"), text("4"), text("1")],
                vec![text("Jules"), text("North"), text("many"), text("1")],
            ],
        );
        match parse_agents(&table, false).unwrap_err() {
            DashboardError::InvalidNumber { row, column, value, .. } => {
                assert_eq!(row, 3);
                assert_eq!(column, "callsmade");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fractional_or_negative_counts_are_rejected() {
        assert_eq!(parse_count(&Cell::Number(2.5)), Err("not a whole number"));
        assert_eq!(parse_count(&text("-3")), Err("negative"));
        assert_eq!(parse_count(&text("4.0")), Ok(4));
        assert_eq!(parse_amount(&Cell::Empty), Err("missing value"));
    }

    #[test]
    fn blank_rows_are_skipped() {
        let table = agent_table(
            &["acmname", "branches", "callsmade", "ptpamount"],
            vec![
                vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty],
                vec![text("Avery"), text("North"), text("4"), text("1")],
                vec![],
            ],
        );
        assert_eq!(parse_agents(&table, false).unwrap().len(), 1);
    }

    #[test]
    fn timestamps_accept_common_layouts() {
        let cases = [
            "2024-01-01T09:15",
            "2024-01-01 09:15:00",
            "2024-01-01T09:15:00Z",
            "01/01/2024 09:15",
            "2024/01/01 09:15:30",
        ];
        for case in cases {
            let parsed = parse_timestamp(&text(case)).unwrap_or_else(|| panic!("{case}"));
            assert_eq!(parsed.hour(), 9, "{case}");
        }
        let date_only = parse_timestamp(&text("2024-01-01")).unwrap();
        assert_eq!(date_only.hour(), 0);
        assert!(parse_timestamp(&text("yesterday")).is_none());
    }

    #[test]
    fn excel_serials_convert_to_datetimes() {
        // 45292.5 is 2024-01-01 12:00
        let parsed = parse_timestamp(&Cell::Number(45292.5)).unwrap();
        assert_eq!(parsed.to_string(), "2024-01-01 12:00:00");
    }

    #[test]
    fn serials_past_year_9999_are_invalid_timestamps() {
        assert!(parse_timestamp(&Cell::Number(MAX_EXCEL_SERIAL)).is_none());
        assert!(parse_timestamp(&Cell::Number(-1.0)).is_none());

        let table = RawTable::new(
            "Sheet2",
            vec!["dateactioned".to_string(), "ptpamount".to_string()],
            vec![vec![Cell::Number(1.0e12), text("5")]],
        );
        assert!(matches!(
            parse_events(&table, false).unwrap_err(),
            DashboardError::InvalidTimestamp { row: 2, .. }
        ));
    }

    #[test]
    fn oversized_values_are_rejected_at_load() {
        assert_eq!(parse_amount(&text("1000000000000000")), Ok(MAX_AMOUNT));
        assert_eq!(parse_amount(&text("1000000000000000.01")), Err("out of range"));
        assert_eq!(parse_count(&text("4294967296")), Err("out of range"));

        let table = agent_table(
            &["acmname", "branches", "callsmade", "ptpamount"],
            vec![
                vec![text("Avery"), text("North"), text("1"), text("50000000000000000000000000000")],
                vec![text("Jules"), text("North"), text("1"), text("50000000000000000000000000000")],
            ],
        );
        match parse_agents(&table, false).unwrap_err() {
            DashboardError::InvalidNumber { row, column, reason, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "ptpamount");
                assert_eq!(reason, "out of range");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_timestamp_is_fatal() {
        let table = RawTable::new(
            "Sheet2",
            vec!["DateActioned".to_string(), "PTPAmount".to_string()],
            vec![vec![text("not a date"), text("5")]],
        );
        assert!(matches!(
            parse_events(&table, false).unwrap_err(),
            DashboardError::InvalidTimestamp { row: 2, .. }
        ));
    }

    #[test]
    fn csv_directory_source_loads_both_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let mut agents = File::create(dir.path().join("Sheet1.csv")).unwrap();
        writeln!(agents, " ACMName ,Branches,CallsMade,PTPAmount").unwrap();
        writeln!(agents, "Avery,North,12,100.50").unwrap();
        writeln!(agents, "Jules,South,8,40").unwrap();
        let mut events = File::create(dir.path().join("Sheet2.csv")).unwrap();
        writeln!(events, "DateActioned,PTPAmount").unwrap();
        writeln!(events, "2024-01-01 09:15:00,100").unwrap();

        let mut source = open_source(dir.path()).unwrap();
        let options = LoadOptions {
            agent_sheet: "Sheet1".to_string(),
            event_sheet: "Sheet2".to_string(),
            strict_schema: true,
        };
        let dataset = load_dataset(source.as_mut(), &options).unwrap();
        assert_eq!(dataset.agents.len(), 2);
        assert_eq!(dataset.events.len(), 1);
        assert_eq!(dataset.agents[0].acm_name, "Avery");
    }

    #[test]
    fn missing_sheet_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = open_source(dir.path()).unwrap();
        assert!(matches!(
            source.read_table("Sheet1").unwrap_err(),
            DashboardError::SheetNotFound { .. }
        ));
    }

    #[test]
    fn missing_workbook_is_reported() {
        let err = open_source(Path::new("/nonexistent/callsmade.xlsx")).err().unwrap();
        assert!(matches!(err, DashboardError::Io(_)));
    }

    #[test]
    fn workbook_cells_convert_by_type() {
        assert_eq!(Cell::from(&Data::Empty), Cell::Empty);
        assert_eq!(Cell::from(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(Cell::from(&Data::Float(2.5)), Cell::Number(2.5));
        assert_eq!(
            Cell::from(&Data::String(" Avery ".to_string())),
            Cell::Text(" Avery ".to_string())
        );
        assert_eq!(
            Cell::from(&Data::DateTimeIso("2024-01-01T09:15:00".to_string())),
            Cell::Text("2024-01-01T09:15:00".to_string())
        );
        assert_eq!(Cell::from(&Data::Bool(true)), Cell::Text("true".to_string()));

        // 45292.375 is 2024-01-01 09:00
        let datetime = Data::DateTime(ExcelDateTime::new(45292.375, ExcelDateTimeType::DateTime, false));
        match Cell::from(&datetime) {
            Cell::DateTime(value) => assert_eq!(value.to_string(), "2024-01-01 09:00:00"),
            other => panic!("unexpected cell: {other:?}"),
        }

        match Cell::from(&Data::Error(CellErrorType::Div0)) {
            Cell::Text(text) => assert!(text.contains("DIV/0")),
            other => panic!("unexpected cell: {other:?}"),
        }
    }

    fn write_workbook(path: &Path, header_offset: u32, event_time: &str) {
        let mut workbook = Workbook::new();
        let timestamp = Format::new().set_num_format("yyyy-mm-dd hh:mm");

        let agents = workbook.add_worksheet();
        agents.set_name("Sheet1").unwrap();
        for (col, header) in [" ACMName ", "Branches", "CallsMade", "PTPAmount"].iter().enumerate() {
            agents.write_string(header_offset, col as u16, *header).unwrap();
        }
        agents.write_string(header_offset + 1, 0, "Avery").unwrap();
        agents.write_number(header_offset + 1, 1, 101).unwrap();
        agents.write_number(header_offset + 1, 2, 12).unwrap();
        agents.write_number(header_offset + 1, 3, 150.5).unwrap();
        agents.write_string(header_offset + 2, 0, "Jules").unwrap();
        agents.write_string(header_offset + 2, 1, "North").unwrap();
        agents.write_number(header_offset + 2, 2, 8).unwrap();
        agents.write_string(header_offset + 2, 3, "40").unwrap();

        let events = workbook.add_worksheet();
        events.set_name("Sheet2").unwrap();
        events.write_string(header_offset, 0, "DateActioned").unwrap();
        events.write_string(header_offset, 1, "PTPAmount").unwrap();
        match rust_xlsxwriter::ExcelDateTime::parse_from_str(event_time) {
            Ok(value) => {
                events
                    .write_datetime_with_format(header_offset + 1, 0, &value, &timestamp)
                    .unwrap();
            }
            Err(_) => {
                events.write_string(header_offset + 1, 0, event_time).unwrap();
            }
        }
        events.write_number(header_offset + 1, 1, 100).unwrap();

        workbook.save(path).unwrap();
    }

    fn workbook_options() -> LoadOptions {
        LoadOptions {
            agent_sheet: "Sheet1".to_string(),
            event_sheet: "Sheet2".to_string(),
            strict_schema: true,
        }
    }

    #[test]
    fn xlsx_workbook_loads_both_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("callsmade.xlsx");
        write_workbook(&path, 0, "2024-01-01 09:15:00");

        let mut source = open_source(&path).unwrap();
        let dataset = load_dataset(source.as_mut(), &workbook_options()).unwrap();

        assert_eq!(dataset.agents.len(), 2);
        assert_eq!(dataset.agents[0].acm_name, "Avery");
        assert_eq!(dataset.agents[0].branch, "101");
        assert_eq!(dataset.agents[0].calls_made, 12);
        assert_eq!(dataset.agents[0].ptp_amount, Decimal::new(1505, 1));
        assert_eq!(dataset.agents[1].ptp_amount, Decimal::from(40));
        assert_eq!(dataset.events.len(), 1);
        assert_eq!(dataset.events[0].date_actioned.hour(), 9);
        assert_eq!(dataset.events[0].date_actioned.minute(), 15);
    }

    #[test]
    fn xlsx_missing_sheet_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("callsmade.xlsx");
        write_workbook(&path, 0, "2024-01-01 09:15:00");

        let mut source = WorkbookSource::open(&path).unwrap();
        match source.read_table("Sheet3").unwrap_err() {
            DashboardError::SheetNotFound { sheet, .. } => assert_eq!(sheet, "Sheet3"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn xlsx_row_numbers_follow_the_sheet_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offset.xlsx");
        write_workbook(&path, 2, "not a date");

        let mut source = WorkbookSource::open(&path).unwrap();
        let agents = source.read_table("Sheet1").unwrap();
        assert_eq!(agents.header_row, 3);
        assert_eq!(parse_agents(&agents, true).unwrap().len(), 2);

        let events = source.read_table("Sheet2").unwrap();
        assert!(matches!(
            parse_events(&events, true).unwrap_err(),
            DashboardError::InvalidTimestamp { row: 4, .. }
        ));
    }
}
