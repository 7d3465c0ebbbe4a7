use std::fs;
use std::io::Read;

use prodtrack_app_lib::db::DbPool;
use prodtrack_app_lib::models::operator::{OperatorCreateInput, Role};
use prodtrack_app_lib::models::product::{ProductCreateInput, ProductKind};
use prodtrack_app_lib::models::production::{ProductionCreateInput, ProductionDetailInput};
use prodtrack_app_lib::models::report::{
    ExportFormat, ExportOutcome, ReportGrouping, ReportParams, NO_CATEGORY_BUCKET, NO_DATA_MESSAGE,
    NO_SHIFT_LABEL,
};
use prodtrack_app_lib::services::catalog_service::CatalogService;
use prodtrack_app_lib::services::production_service::ProductionService;
use prodtrack_app_lib::services::realtime::ChangeFeed;
use prodtrack_app_lib::services::report_service::ReportService;
use tempfile::{tempdir, TempDir};

struct Fixture {
    dir: TempDir,
    catalog: CatalogService,
    production: ProductionService,
    reports: ReportService,
}

fn fixture() -> Fixture {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("reports.sqlite")).expect("db pool");
    let feed = ChangeFeed::new();
    let reports = ReportService::new(pool.clone(), dir.path().join("out")).expect("report service");
    Fixture {
        catalog: CatalogService::new(pool.clone(), feed.clone()),
        production: ProductionService::new(pool, feed),
        reports,
        dir,
    }
}

fn xml_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).expect("xlsx archive");
    let mut part = archive.by_name(name).expect("workbook part");
    let mut xml = String::new();
    part.read_to_string(&mut xml).expect("utf-8 part");
    xml
}

fn params(from: &str, to: &str) -> ReportParams {
    ReportParams {
        from: from.into(),
        to: to.into(),
        grouping: ReportGrouping::Category,
        category: None,
    }
}

/// Operator, categorized machine and product; returns their ids.
fn seed(fixture: &Fixture) -> (i64, i64, i64) {
    let operator = fixture
        .catalog
        .create_operator(OperatorCreateInput {
            cedula: "1001".into(),
            full_name: "Juan Pérez".into(),
            role: Role::Operator,
            password: "turno-2024".into(),
        })
        .expect("operator");
    let machine = fixture
        .catalog
        .create_machine("Inyectora 1", Some("Inyección"))
        .expect("machine");
    let product = fixture
        .catalog
        .create_product(ProductCreateInput {
            name: "Esfera 8cm".into(),
            kind: ProductKind::General,
            target_8h: Some(250.0),
            target_10h: Some(300.0),
            general_target: None,
        })
        .expect("product");
    (operator.id, machine.id, product.id)
}

fn submit(fixture: &Fixture, date: &str, operator_id: i64, machine_id: i64, product_id: i64) -> i64 {
    fixture
        .production
        .submit(ProductionCreateInput {
            date: date.into(),
            shift: "8 horas".into(),
            machine_id,
            operator_id,
            is_assistant: false,
            assistant_ids: vec![],
            details: vec![ProductionDetailInput {
                product_id,
                design_id: None,
                quantity: 300.0,
            }],
            notes: Some("cambio de molde".into()),
        })
        .expect("submit")
        .id
}

#[test]
fn empty_month_reports_no_data_without_writing_a_file() {
    let fixture = fixture();
    let outcome = fixture
        .reports
        .export(params("2024-02-01", "2024-02-29"))
        .expect("export");

    assert_eq!(
        outcome,
        ExportOutcome::NoData {
            message: NO_DATA_MESSAGE.to_string()
        }
    );
    let written = fs::read_dir(fixture.reports.reports_dir()).expect("reports dir").count();
    assert_eq!(written, 0);
}

#[test]
fn ranges_over_three_months_are_rejected() {
    let fixture = fixture();
    let err = fixture
        .reports
        .export(params("2024-01-01", "2024-05-01"))
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn single_record_round_trips_through_the_workbook() {
    let fixture = fixture();
    let (operator_id, machine_id, product_id) = seed(&fixture);
    submit(&fixture, "2024-03-04", operator_id, machine_id, product_id);

    let request = params("2024-03-04", "2024-03-04");
    let (_, buckets) = fixture.reports.build(&request).expect("build");
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].name, "Inyección");
    let row = &buckets[0].rows[0];
    assert_eq!(buckets[0].rows.len(), 1);
    assert_eq!(row.operator, "Juan Pérez");
    assert_eq!(row.machine, "Inyectora 1");
    assert_eq!(row.product, "Esfera 8cm");
    assert_eq!(row.quantity, 300.0);
    assert!((row.percentage - 120.0).abs() < 1e-9);

    let outcome = fixture.reports.export(request).expect("export");
    let result = outcome.generated().expect("generated");
    assert_eq!(result.format, ExportFormat::Xlsx);
    assert_eq!(result.file_name, "reporte_produccion_2024-03-04_a_2024-03-04.xlsx");
    assert_eq!(result.sheet_count, 2);
    assert_eq!(result.row_count, 1);

    let bytes = fs::read(&result.file_path).expect("workbook on disk");
    for part in ["xl/worksheets/sheet1.xml", "xl/worksheets/sheet2.xml"] {
        let sheet = xml_part(&bytes, part);
        // 120% is stored as a fraction in the compliance column.
        let cell = &sheet[sheet.find(r#"<c r="H5""#).expect("compliance cell")..];
        let value = &cell[cell.find("<v>").expect("value") + 3..cell.find("</v>").expect("value end")];
        assert!((value.parse::<f64>().expect("number") - 1.2).abs() < 1e-9, "{part}");
        assert!(sheet.contains(r#"orientation="landscape""#), "{part}");
    }
    let workbook = xml_part(&bytes, "xl/workbook.xml");
    assert!(workbook.contains("Todos"));
    assert_eq!(workbook.matches("_xlnm.Print_Titles").count(), 2);
}

#[test]
fn idle_days_are_zero_filled_per_category() {
    let fixture = fixture();
    let (operator_id, machine_id, product_id) = seed(&fixture);
    submit(&fixture, "2024-03-04", operator_id, machine_id, product_id);
    let loose = fixture.catalog.create_machine("Selladora", None).expect("machine");
    submit(&fixture, "2024-03-06", operator_id, loose.id, product_id);

    let (_, buckets) = fixture
        .reports
        .build(&params("2024-03-04", "2024-03-06"))
        .expect("build");
    let names: Vec<&str> = buckets.iter().map(|bucket| bucket.name.as_str()).collect();
    assert_eq!(names, vec!["Inyección", NO_CATEGORY_BUCKET]);

    // Worked 4th and 6th; only the 5th is idle in each category.
    for bucket in &buckets {
        let placeholders: Vec<_> = bucket.rows.iter().filter(|row| row.placeholder).collect();
        assert_eq!(placeholders.len(), 1, "bucket {}", bucket.name);
        assert_eq!(placeholders[0].date.to_string(), "2024-03-05");
        assert_eq!(placeholders[0].shift, NO_SHIFT_LABEL);
    }
}

#[test]
fn category_filter_and_machine_grouping() {
    let fixture = fixture();
    let (operator_id, machine_id, product_id) = seed(&fixture);
    submit(&fixture, "2024-03-04", operator_id, machine_id, product_id);
    let other = fixture
        .catalog
        .create_machine("Sopladora", Some("Soplado"))
        .expect("machine");
    submit(&fixture, "2024-03-04", operator_id, other.id, product_id);

    let mut filtered = params("2024-03-04", "2024-03-04");
    filtered.category = Some("soplado".into());
    let outcome = fixture.reports.export(filtered).expect("export");
    let result = outcome.generated().expect("generated");
    assert_eq!(result.file_name, "reporte_soplado_2024-03-04_a_2024-03-04.xlsx");
    assert_eq!(result.row_count, 1);

    let mut missing = params("2024-03-04", "2024-03-04");
    missing.category = Some("Pintura".into());
    assert!(matches!(
        fixture.reports.export(missing).expect("export"),
        ExportOutcome::NoData { .. }
    ));

    let mut by_machine = params("2024-03-04", "2024-03-04");
    by_machine.grouping = ReportGrouping::Machine;
    let (_, buckets) = fixture.reports.build(&by_machine).expect("build");
    let names: Vec<&str> = buckets.iter().map(|bucket| bucket.name.as_str()).collect();
    assert_eq!(names, vec!["Inyectora 1", "Sopladora"]);
}

#[test]
fn registration_pdf_is_named_after_machine_and_date() {
    let fixture = fixture();
    let (operator_id, machine_id, product_id) = seed(&fixture);
    let record_id = submit(&fixture, "2024-03-04", operator_id, machine_id, product_id);

    let result = fixture
        .reports
        .export_registration_pdf(record_id)
        .expect("pdf export");
    assert_eq!(result.format, ExportFormat::Pdf);
    assert_eq!(result.file_name, "registro_inyectora_1_2024-03-04.pdf");
    assert_eq!(result.row_count, 1);

    let bytes = fs::read(fixture.dir.path().join("out").join(&result.file_name)).expect("pdf");
    assert!(bytes.starts_with(b"%PDF"));

    assert!(fixture.reports.export_registration_pdf(9_999).is_err());
}
