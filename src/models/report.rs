use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const NO_CATEGORY_BUCKET: &str = "Sin categoría";
pub const NO_SHIFT_LABEL: &str = "Sin turno";
pub const MISSING_ENTITY: &str = "N/A";
pub const ALL_ROWS_SHEET: &str = "Todos";
pub const NO_DATA_MESSAGE: &str = "No hay registros de producción en el rango seleccionado";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReportGrouping {
    Category,
    Machine,
}

impl Default for ReportGrouping {
    fn default() -> Self {
        ReportGrouping::Category
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub grouping: ReportGrouping,
    /// Restricts the report to a single category (area report).
    #[serde(default)]
    pub category: Option<String>,
}

/// Flattened row ready for tabular output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub date: NaiveDate,
    pub shift: String,
    pub operator: String,
    pub machine: String,
    pub category: String,
    pub product: String,
    pub quantity: f64,
    pub percentage: f64,
    pub assistants: String,
    /// Zero-filled row for an operator without a shift that day.
    #[serde(default)]
    pub placeholder: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportBucket {
    pub name: String,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub file_path: String,
    pub file_name: String,
    pub format: ExportFormat,
    pub generated_at: String,
    pub sheet_count: usize,
    pub row_count: usize,
}

/// Empty ranges are reported as `NoData`, never as an error or an empty file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExportOutcome {
    Generated(ExportResult),
    NoData { message: String },
}

impl ExportOutcome {
    pub fn no_data() -> Self {
        ExportOutcome::NoData {
            message: NO_DATA_MESSAGE.to_string(),
        }
    }

    pub fn generated(&self) -> Option<&ExportResult> {
        match self {
            ExportOutcome::Generated(result) => Some(result),
            ExportOutcome::NoData { .. } => None,
        }
    }
}
