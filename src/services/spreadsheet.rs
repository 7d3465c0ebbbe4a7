//! Multi-sheet workbook writer for production reports.

use std::collections::HashSet;
use std::path::Path;

use chrono::Datelike;
use rust_xlsxwriter::{
    Color, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet,
};

use crate::error::{AppError, AppResult};
use crate::models::report::{ReportBucket, ReportRow, ALL_ROWS_SHEET};
use crate::utils::dates::{to_display, DateRange};

const MAX_SHEET_NAME: usize = 31;
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
const TITLE_ROW: u32 = 0;
const SUBTITLE_ROW: u32 = 1;
const HEADER_ROW: u32 = 3;
const DATE_FORMAT: &str = "dd/mm/yyyy";
const QUANTITY_FORMAT: &str = "#,##0.00";
const PERCENT_FORMAT: &str = "0.00%";

const COLUMNS: [(&str, f64); 9] = [
    ("Fecha", 12.0),
    ("Turno", 11.0),
    ("Operario", 26.0),
    ("Máquina", 18.0),
    ("Categoría", 16.0),
    ("Producto", 28.0),
    ("Cantidad", 11.0),
    ("% Cumplimiento", 15.0),
    ("Ayudantes", 30.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkbookSummary {
    pub sheet_count: usize,
    pub row_count: usize,
}

struct Formats {
    title: Format,
    subtitle: Format,
    header: Format,
    text: Format,
    date: Format,
    number: Format,
    percent: Format,
    placeholder: Format,
    placeholder_date: Format,
    placeholder_number: Format,
    placeholder_percent: Format,
}

impl Formats {
    fn new() -> Self {
        let cell = Format::new().set_border(FormatBorder::Thin);
        let muted = cell.clone().set_italic().set_font_color(Color::Gray);
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            subtitle: Format::new().set_italic().set_align(FormatAlign::Center),
            header: cell
                .clone()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_background_color(Color::RGB(0xD9E1F2)),
            text: cell.clone(),
            date: cell.clone().set_num_format(DATE_FORMAT),
            number: cell.clone().set_num_format(QUANTITY_FORMAT),
            percent: cell.clone().set_num_format(PERCENT_FORMAT),
            placeholder_date: muted.clone().set_num_format(DATE_FORMAT),
            placeholder_number: muted.clone().set_num_format(QUANTITY_FORMAT),
            placeholder_percent: muted.clone().set_num_format(PERCENT_FORMAT),
            placeholder: muted,
        }
    }
}

/// Writes one sheet per bucket followed by an aggregate sheet holding every
/// row, and saves the workbook at `path`.
pub fn write_report(
    path: &Path,
    title: &str,
    range: &DateRange,
    buckets: &[ReportBucket],
) -> AppResult<WorkbookSummary> {
    let mut workbook = Workbook::new();
    let summary = fill_workbook(&mut workbook, title, range, buckets)?;
    workbook.save(path)?;
    Ok(summary)
}

/// Same layout as [`write_report`], kept in memory.
pub fn render_report(
    title: &str,
    range: &DateRange,
    buckets: &[ReportBucket],
) -> AppResult<(Vec<u8>, WorkbookSummary)> {
    let mut workbook = Workbook::new();
    let summary = fill_workbook(&mut workbook, title, range, buckets)?;
    let bytes = workbook.save_to_buffer()?;
    Ok((bytes, summary))
}

fn fill_workbook(
    workbook: &mut Workbook,
    title: &str,
    range: &DateRange,
    buckets: &[ReportBucket],
) -> AppResult<WorkbookSummary> {
    if buckets.is_empty() {
        return Err(AppError::export("xlsx", "no hay hojas para escribir"));
    }

    let formats = Formats::new();
    let subtitle = format!(
        "Del {} al {}",
        to_display(range.start()),
        to_display(range.end())
    );

    let names: Vec<&str> = buckets
        .iter()
        .map(|bucket| bucket.name.as_str())
        .chain(std::iter::once(ALL_ROWS_SHEET))
        .collect();
    let sheet_names = unique_sheet_names(&names);

    let mut all_rows: Vec<&ReportRow> = Vec::new();
    for (bucket, sheet_name) in buckets.iter().zip(&sheet_names) {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name)?;
        let rows: Vec<&ReportRow> = bucket.rows.iter().collect();
        write_sheet(
            sheet,
            &format!("{title} - {}", bucket.name),
            &subtitle,
            &rows,
            &formats,
        )?;
        all_rows.extend(rows);
    }

    all_rows.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.operator.to_lowercase().cmp(&b.operator.to_lowercase()))
    });

    let sheet = workbook.add_worksheet();
    sheet.set_name(&sheet_names[sheet_names.len() - 1])?;
    write_sheet(sheet, title, &subtitle, &all_rows, &formats)?;

    Ok(WorkbookSummary {
        sheet_count: sheet_names.len(),
        row_count: all_rows.len(),
    })
}

fn write_sheet(
    sheet: &mut Worksheet,
    title: &str,
    subtitle: &str,
    rows: &[&ReportRow],
    formats: &Formats,
) -> AppResult<()> {
    let last_col = (COLUMNS.len() - 1) as u16;
    sheet.merge_range(TITLE_ROW, 0, TITLE_ROW, last_col, title, &formats.title)?;
    sheet.set_row_height(TITLE_ROW, 24)?;
    sheet.merge_range(SUBTITLE_ROW, 0, SUBTITLE_ROW, last_col, subtitle, &formats.subtitle)?;

    for (col, (header, width)) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(HEADER_ROW, col, *header, &formats.header)?;
        sheet.set_column_width(col, *width)?;
    }

    for (offset, row) in rows.iter().enumerate() {
        let line = HEADER_ROW + 1 + offset as u32;
        let (text, date, number, percent) = if row.placeholder {
            (
                &formats.placeholder,
                &formats.placeholder_date,
                &formats.placeholder_number,
                &formats.placeholder_percent,
            )
        } else {
            (&formats.text, &formats.date, &formats.number, &formats.percent)
        };

        let day = ExcelDateTime::from_ymd(
            row.date.year() as u16,
            row.date.month() as u8,
            row.date.day() as u8,
        )?;
        sheet.write_datetime_with_format(line, 0, &day, date)?;
        sheet.write_string_with_format(line, 1, &row.shift, text)?;
        sheet.write_string_with_format(line, 2, &row.operator, text)?;
        sheet.write_string_with_format(line, 3, &row.machine, text)?;
        sheet.write_string_with_format(line, 4, &row.category, text)?;
        sheet.write_string_with_format(line, 5, &row.product, text)?;
        sheet.write_number_with_format(line, 6, row.quantity, number)?;
        sheet.write_number_with_format(line, 7, row.percentage / 100.0, percent)?;
        sheet.write_string_with_format(line, 8, &row.assistants, text)?;
    }

    sheet.set_freeze_panes(HEADER_ROW + 1, 0)?;
    sheet.set_landscape();
    sheet.set_paper_size(9);
    sheet.set_margins(0.4, 0.4, 0.6, 0.6, 0.3, 0.3);
    sheet.set_repeat_rows(HEADER_ROW, HEADER_ROW)?;
    sheet.set_print_fit_to_pages(1, 0);
    Ok(())
}

/// Excel sheet names: at most 31 characters, none of `[]:*?/\`, and unique
/// ignoring case.
pub fn unique_sheet_names(names: &[&str]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    names
        .iter()
        .map(|name| {
            let base = sanitize_sheet_name(name);
            let mut candidate = base.clone();
            let mut suffix = 2;
            while !taken.insert(candidate.to_lowercase()) {
                let tail = format!(" ({suffix})");
                let keep = MAX_SHEET_NAME.saturating_sub(tail.chars().count());
                candidate = format!("{}{tail}", base.chars().take(keep).collect::<String>());
                suffix += 1;
            }
            candidate
        })
        .collect()
}

fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '-' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let truncated: String = cleaned.chars().take(MAX_SHEET_NAME).collect();
    if truncated.trim().is_empty() {
        "Hoja".to_string()
    } else {
        truncated
    }
}
