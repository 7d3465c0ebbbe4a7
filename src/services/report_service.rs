use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::db::repositories::production_repository::ProductionRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::production::ProductionRecord;
use crate::models::report::{
    ExportFormat, ExportOutcome, ExportResult, ReportBucket, ReportGrouping, ReportParams,
    ReportRow, MISSING_ENTITY, NO_CATEGORY_BUCKET, NO_SHIFT_LABEL,
};
use crate::services::pdf_export::{self, RegistrationLine};
use crate::services::spreadsheet;
use crate::services::targets::{evaluate_detail, ShiftLength};
use crate::utils::dates::{to_iso, DateRange};

const REPORT_PREFIX: &str = "reporte_produccion";
const REGISTRATION_PREFIX: &str = "registro";

pub struct ReportService {
    db: DbPool,
    reports_dir: PathBuf,
}

impl ReportService {
    pub fn new(db: DbPool, reports_dir: impl Into<PathBuf>) -> AppResult<Self> {
        let reports_dir = reports_dir.into();
        std::fs::create_dir_all(&reports_dir)?;
        Ok(Self { db, reports_dir })
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Grouped rows for the requested range. An empty vector means the range
    /// (after the category filter) holds no records.
    pub fn build(&self, params: &ReportParams) -> AppResult<(DateRange, Vec<ReportBucket>)> {
        let range = DateRange::parse(&params.from, &params.to)?;
        let records = self
            .db
            .with_connection(|conn| ProductionRepository::list_in_range(conn, &range))?;
        debug!(
            target: "app::report",
            records = records.len(),
            start = %range.start(),
            end = %range.end(),
            "production records fetched"
        );

        let records = filter_by_category(records, params.category.as_deref());
        let buckets = match params.grouping {
            ReportGrouping::Category => group_by_category(&records, &range),
            ReportGrouping::Machine => group_by_machine(&records),
        };
        Ok((range, buckets))
    }

    pub fn export(&self, params: ReportParams) -> AppResult<ExportOutcome> {
        let (range, buckets) = self.build(&params)?;
        if buckets.iter().all(|bucket| bucket.rows.is_empty()) {
            info!(
                target: "app::report",
                start = %range.start(),
                end = %range.end(),
                "no production data in range, skipping export"
            );
            return Ok(ExportOutcome::no_data());
        }

        let title = match params.category.as_deref() {
            Some(category) => format!("Producción {category}"),
            None => "Reporte de producción".to_string(),
        };
        let file_name = match params.category.as_deref() {
            Some(category) => format!(
                "reporte_{}_{}_a_{}.{}",
                file_slug(category),
                to_iso(range.start()),
                to_iso(range.end()),
                ExportFormat::Xlsx.file_extension()
            ),
            None => format!(
                "{REPORT_PREFIX}_{}_a_{}.{}",
                to_iso(range.start()),
                to_iso(range.end()),
                ExportFormat::Xlsx.file_extension()
            ),
        };
        let path = self.reports_dir.join(&file_name);

        let summary = spreadsheet::write_report(&path, &title, &range, &buckets)?;
        info!(
            target: "app::report",
            file = %path.display(),
            sheets = summary.sheet_count,
            rows = summary.row_count,
            "spreadsheet report written"
        );

        Ok(ExportOutcome::Generated(ExportResult {
            file_path: path.to_string_lossy().to_string(),
            file_name,
            format: ExportFormat::Xlsx,
            generated_at: Utc::now().to_rfc3339(),
            sheet_count: summary.sheet_count,
            row_count: summary.row_count,
        }))
    }

    /// Single-record summary document for printing at the machine.
    pub fn export_registration_pdf(&self, record_id: i64) -> AppResult<ExportResult> {
        let record = self
            .db
            .with_connection(|conn| ProductionRepository::find_by_id(conn, record_id))?
            .ok_or_else(AppError::not_found)?;

        let shift = ShiftLength::from_label(&record.shift);
        let lines: Vec<RegistrationLine> = record
            .details
            .iter()
            .map(|detail| {
                let (target, percentage) = evaluate_detail(detail, shift);
                RegistrationLine {
                    product: detail_product_name(detail),
                    quantity: detail.quantity,
                    target,
                    percentage,
                }
            })
            .collect();

        let machine_name = record
            .machine
            .as_ref()
            .map(|machine| machine.name.as_str())
            .unwrap_or(MISSING_ENTITY);
        let file_name = format!(
            "{REGISTRATION_PREFIX}_{}_{}.{}",
            file_slug(machine_name),
            to_iso(record.date),
            ExportFormat::Pdf.file_extension()
        );
        let path = self.reports_dir.join(&file_name);

        let bytes = pdf_export::render_registration(&record, &lines)?;
        std::fs::write(&path, bytes)?;
        info!(target: "app::report", record_id, file = %path.display(), "registration pdf written");

        Ok(ExportResult {
            file_path: path.to_string_lossy().to_string(),
            file_name,
            format: ExportFormat::Pdf,
            generated_at: Utc::now().to_rfc3339(),
            sheet_count: 1,
            row_count: lines.len(),
        })
    }
}

fn filter_by_category(records: Vec<ProductionRecord>, category: Option<&str>) -> Vec<ProductionRecord> {
    let Some(wanted) = category.map(str::trim).filter(|value| !value.is_empty()) else {
        return records;
    };
    let wanted = wanted.to_lowercase();
    records
        .into_iter()
        .filter(|record| bucket_name(record).to_lowercase() == wanted)
        .collect()
}

fn bucket_name(record: &ProductionRecord) -> String {
    record
        .category()
        .map(str::to_string)
        .unwrap_or_else(|| NO_CATEGORY_BUCKET.to_string())
}

/// One bucket per machine category, zero-filled so every operator seen in a
/// category has a row for each day of the range.
pub fn group_by_category(records: &[ProductionRecord], range: &DateRange) -> Vec<ReportBucket> {
    let mut rows_by_bucket: BTreeMap<String, Vec<ReportRow>> = BTreeMap::new();
    let mut operators_by_bucket: HashMap<String, HashMap<i64, String>> = HashMap::new();
    let mut worked: HashSet<(i64, NaiveDate)> = HashSet::new();

    for record in records {
        let bucket = bucket_name(record);
        if let Some(operator) = &record.operator {
            worked.insert((operator.id, record.date));
            operators_by_bucket
                .entry(bucket.clone())
                .or_default()
                .insert(operator.id, operator.full_name.clone());
        }
        rows_by_bucket
            .entry(bucket)
            .or_default()
            .extend(record_rows(record));
    }

    for (bucket, operators) in &operators_by_bucket {
        let rows = rows_by_bucket.entry(bucket.clone()).or_default();
        for day in range.days() {
            for (operator_id, full_name) in operators {
                if !worked.contains(&(*operator_id, day)) {
                    rows.push(placeholder_row(day, full_name, bucket));
                }
            }
        }
    }

    finish_buckets(rows_by_bucket)
}

pub fn group_by_machine(records: &[ProductionRecord]) -> Vec<ReportBucket> {
    let mut rows_by_bucket: BTreeMap<String, Vec<ReportRow>> = BTreeMap::new();
    for record in records {
        let machine = record
            .machine
            .as_ref()
            .map(|machine| machine.name.clone())
            .unwrap_or_else(|| MISSING_ENTITY.to_string());
        rows_by_bucket
            .entry(machine)
            .or_default()
            .extend(record_rows(record));
    }
    finish_buckets(rows_by_bucket)
}

fn finish_buckets(rows_by_bucket: BTreeMap<String, Vec<ReportRow>>) -> Vec<ReportBucket> {
    let mut buckets: Vec<ReportBucket> = rows_by_bucket
        .into_iter()
        .map(|(name, mut rows)| {
            sort_rows(&mut rows);
            ReportBucket { name, rows }
        })
        .collect();
    buckets.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    buckets
}

/// Date ascending, then operator name; stable so record order is kept.
pub fn sort_rows(rows: &mut [ReportRow]) {
    rows.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.operator.to_lowercase().cmp(&b.operator.to_lowercase()))
    });
}

/// Flattens a record into one row per detail line. A record without lines
/// still yields one row so it is never silently dropped.
pub fn record_rows(record: &ProductionRecord) -> Vec<ReportRow> {
    let shift = ShiftLength::from_label(&record.shift);
    let operator = record
        .operator
        .as_ref()
        .map(|operator| operator.full_name.clone())
        .unwrap_or_else(|| MISSING_ENTITY.to_string());
    let machine = record
        .machine
        .as_ref()
        .map(|machine| machine.name.clone())
        .unwrap_or_else(|| MISSING_ENTITY.to_string());
    let category = bucket_name(record);
    let assistants = record
        .assistants
        .iter()
        .map(|assistant| assistant.full_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let base = ReportRow {
        date: record.date,
        shift: record.shift.clone(),
        operator,
        machine,
        category,
        product: MISSING_ENTITY.to_string(),
        quantity: 0.0,
        percentage: 0.0,
        assistants,
        placeholder: false,
    };

    if record.details.is_empty() {
        return vec![base];
    }

    record
        .details
        .iter()
        .map(|detail| {
            let (_, percentage) = evaluate_detail(detail, shift);
            ReportRow {
                product: detail_product_name(detail),
                quantity: detail.quantity,
                percentage,
                ..base.clone()
            }
        })
        .collect()
}

fn detail_product_name(detail: &crate::models::production::ProductionDetail) -> String {
    match (&detail.product, &detail.design) {
        (Some(product), Some(design)) => format!("{} - {}", product.name, design.name),
        (Some(product), None) => product.name.clone(),
        (None, _) => MISSING_ENTITY.to_string(),
    }
}

fn placeholder_row(date: NaiveDate, operator: &str, bucket: &str) -> ReportRow {
    ReportRow {
        date,
        shift: NO_SHIFT_LABEL.to_string(),
        operator: operator.to_string(),
        machine: String::new(),
        category: bucket.to_string(),
        product: String::new(),
        quantity: 0.0,
        percentage: 0.0,
        assistants: String::new(),
        placeholder: true,
    }
}

fn file_slug(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_was_sep = false;
    for ch in value.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            last_was_sep = false;
        } else if !last_was_sep && !slug.is_empty() {
            slug.push('_');
            last_was_sep = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        "sin_nombre".to_string()
    } else {
        slug
    }
}
