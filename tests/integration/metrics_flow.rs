use prodtrack_app_lib::db::DbPool;
use prodtrack_app_lib::error::AppError;
use prodtrack_app_lib::models::metrics::{BonusTier, RollupDenominator};
use prodtrack_app_lib::models::operator::{OperatorCreateInput, OperatorRecord, Role};
use prodtrack_app_lib::models::product::{ProductCreateInput, ProductKind, ProductRecord};
use prodtrack_app_lib::models::production::{ProductionCreateInput, ProductionDetailInput};
use prodtrack_app_lib::services::catalog_service::CatalogService;
use prodtrack_app_lib::services::metrics_service::MetricsService;
use prodtrack_app_lib::services::production_service::ProductionService;
use prodtrack_app_lib::services::realtime::ChangeFeed;
use prodtrack_app_lib::utils::dates::DateRange;
use tempfile::{tempdir, TempDir};

struct Plant {
    _dir: TempDir,
    catalog: CatalogService,
    production: ProductionService,
    metrics: MetricsService,
}

fn plant() -> Plant {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("metrics.sqlite")).expect("db pool");
    let feed = ChangeFeed::new();
    Plant {
        catalog: CatalogService::new(pool.clone(), feed.clone()),
        production: ProductionService::new(pool.clone(), feed),
        metrics: MetricsService::new(pool),
        _dir: dir,
    }
}

fn operator(plant: &Plant, cedula: &str, name: &str) -> OperatorRecord {
    plant
        .catalog
        .create_operator(OperatorCreateInput {
            cedula: cedula.into(),
            full_name: name.into(),
            role: Role::Operator,
            password: "turno-2024".into(),
        })
        .expect("create operator")
}

fn esfera(plant: &Plant) -> ProductRecord {
    plant
        .catalog
        .create_product(ProductCreateInput {
            name: "Esfera 8cm".into(),
            kind: ProductKind::General,
            target_8h: Some(250.0),
            target_10h: Some(300.0),
            general_target: None,
        })
        .expect("create product")
}

fn submit(
    plant: &Plant,
    date: &str,
    shift: &str,
    machine_id: i64,
    operator_id: i64,
    assistants: Vec<i64>,
    lines: Vec<(i64, f64)>,
) {
    plant
        .production
        .submit(ProductionCreateInput {
            date: date.into(),
            shift: shift.into(),
            machine_id,
            operator_id,
            is_assistant: false,
            assistant_ids: assistants,
            details: lines
                .into_iter()
                .map(|(product_id, quantity)| ProductionDetailInput {
                    product_id,
                    design_id: None,
                    quantity,
                })
                .collect(),
            notes: None,
        })
        .expect("submit production");
}

#[test]
fn monday_shift_scores_and_rolls_up_both_ways() {
    let plant = plant();
    let juan = operator(&plant, "1001", "Juan Pérez");
    let machine = plant
        .catalog
        .create_machine("Inyectora 1", Some("Inyección"))
        .expect("machine");
    let product = esfera(&plant);

    // 2024-03-04 is a Monday; 300 against an 8h target of 250.
    submit(&plant, "2024-03-04", "8 horas", machine.id, juan.id, vec![], vec![(product.id, 300.0)]);

    let march = DateRange::month(2024, 3).expect("march");
    let daily = plant.metrics.daily_metrics(juan.id, &march).expect("daily");
    assert_eq!(daily.len(), 1);
    assert!((daily[0].percentage - 120.0).abs() < 1e-9);
    assert_eq!(daily[0].tier, BonusTier::Positive);

    let summary = plant.metrics.monthly_summary("1001", &march).expect("summary");
    assert_eq!(summary.worked_days, 1);
    assert_eq!(summary.denominator, RollupDenominator::WorkedDays);
    assert!((summary.mean_percentage - 120.0).abs() < 1e-9);
    assert_eq!(summary.tier, BonusTier::Positive);
    assert_eq!(summary.positive_days, 1);

    let bonus = plant.metrics.monthly_bonus_summary("1001", &march).expect("bonus");
    assert_eq!(bonus.denominator, RollupDenominator::ExpectedWorkingDays);
    assert!((bonus.mean_percentage - 5.0).abs() < 1e-9);
    assert_eq!(bonus.tier, BonusTier::Negative);
}

#[test]
fn sunday_records_and_assistant_roles_do_not_score() {
    let plant = plant();
    let juan = operator(&plant, "1001", "Juan Pérez");
    let ana = operator(&plant, "1002", "Ana Gómez");
    let machine = plant
        .catalog
        .create_machine("Inyectora 1", Some("Inyección"))
        .expect("machine");
    let product = esfera(&plant);

    // Sunday.
    submit(&plant, "2024-03-10", "8 horas", machine.id, juan.id, vec![], vec![(product.id, 500.0)]);
    // Tuesday, ten-hour shift, Ana assisting: 150 / 300 = 50%.
    submit(&plant, "2024-03-05", "10 horas", machine.id, juan.id, vec![ana.id], vec![(product.id, 150.0)]);

    let march = DateRange::month(2024, 3).expect("march");
    let juan_summary = plant.metrics.monthly_summary("1001", &march).expect("juan");
    assert_eq!(juan_summary.worked_days, 1);
    assert_eq!(juan_summary.daily[0].date.to_string(), "2024-03-05");
    assert!((juan_summary.mean_percentage - 50.0).abs() < 1e-9);
    assert_eq!(juan_summary.tier, BonusTier::Neutral);

    let ana_summary = plant.metrics.monthly_summary("1002", &march).expect("ana");
    assert_eq!(ana_summary.worked_days, 0);
    assert_eq!(ana_summary.assistant_days, 1);
    assert_eq!(ana_summary.mean_percentage, 0.0);
}

#[test]
fn multi_product_day_sums_line_percentages() {
    let plant = plant();
    let juan = operator(&plant, "1001", "Juan Pérez");
    let machine = plant.catalog.create_machine("Sopladora", None).expect("machine");
    let esfera = esfera(&plant);
    let arbol = plant
        .catalog
        .create_product(ProductCreateInput {
            name: "Árbol atado".into(),
            kind: ProductKind::TreeTied,
            target_8h: Some(1.0),
            target_10h: Some(1.0),
            general_target: Some(40.0),
        })
        .expect("tree product");

    // 125 / 250 = 50% plus 20 / 40 = 50% on the tree-tied general target.
    submit(
        &plant,
        "2024-03-06",
        "8 horas",
        machine.id,
        juan.id,
        vec![],
        vec![(esfera.id, 125.0), (arbol.id, 20.0)],
    );

    let range = DateRange::parse("2024-03-06", "2024-03-06").expect("range");
    let daily = plant.metrics.daily_metrics(juan.id, &range).expect("daily");
    assert_eq!(daily.len(), 1);
    assert!((daily[0].percentage - 100.0).abs() < 1e-9);
    assert!((daily[0].production - 145.0).abs() < 1e-9);
}

#[test]
fn ranking_lists_operators_best_first() {
    let plant = plant();
    let juan = operator(&plant, "1001", "Juan Pérez");
    let ana = operator(&plant, "1002", "Ana Gómez");
    plant
        .catalog
        .create_operator(OperatorCreateInput {
            cedula: "9000".into(),
            full_name: "Jefe de planta".into(),
            role: Role::Admin,
            password: "admin-2024".into(),
        })
        .expect("admin");
    let machine = plant.catalog.create_machine("Inyectora 2", Some("Inyección")).expect("machine");
    let product = esfera(&plant);

    submit(&plant, "2024-03-04", "8 horas", machine.id, juan.id, vec![], vec![(product.id, 100.0)]);
    submit(&plant, "2024-03-04", "8 horas", machine.id, ana.id, vec![], vec![(product.id, 225.0)]);

    let range = DateRange::month(2024, 3).expect("march");
    let ranking = plant
        .metrics
        .summaries_for_all(&range, RollupDenominator::WorkedDays)
        .expect("ranking");
    let names: Vec<&str> = ranking.iter().map(|s| s.operator.full_name.as_str()).collect();
    assert_eq!(names, vec!["Ana Gómez", "Juan Pérez"]);
    assert!((ranking[0].mean_percentage - 90.0).abs() < 1e-9);
}

#[test]
fn lookups_validate_input() {
    let plant = plant();
    let march = DateRange::month(2024, 3).expect("march");

    let missing = plant.metrics.compliance_by_cedula("5555", &march).unwrap_err();
    assert!(matches!(missing, AppError::NotFound));

    let blank = plant.metrics.compliance_by_cedula("  ", &march).unwrap_err();
    assert!(blank.is_validation());

    let too_wide = DateRange::parse("2024-01-01", "2024-05-01").unwrap_err();
    assert!(too_wide.is_validation());

    let reversed = DateRange::parse("2024-03-10", "2024-03-01").unwrap_err();
    assert!(reversed.is_validation());
}

#[test]
fn submission_rejects_bad_input() {
    let plant = plant();
    let juan = operator(&plant, "1001", "Juan Pérez");
    let machine = plant.catalog.create_machine("Inyectora 1", None).expect("machine");
    let product = esfera(&plant);

    let base = ProductionCreateInput {
        date: "2024-03-04".into(),
        shift: "8 horas".into(),
        machine_id: machine.id,
        operator_id: juan.id,
        is_assistant: false,
        assistant_ids: vec![],
        details: vec![ProductionDetailInput {
            product_id: product.id,
            design_id: None,
            quantity: 10.0,
        }],
        notes: None,
    };

    let mut no_lines = base.clone();
    no_lines.details.clear();
    assert!(plant.production.submit(no_lines).unwrap_err().is_validation());

    let mut negative = base.clone();
    negative.details[0].quantity = -1.0;
    assert!(plant.production.submit(negative).unwrap_err().is_validation());

    let mut self_assist = base.clone();
    self_assist.assistant_ids = vec![juan.id];
    assert!(plant.production.submit(self_assist).unwrap_err().is_validation());

    let mut ghost_machine = base.clone();
    ghost_machine.machine_id = 999;
    assert!(plant.production.submit(ghost_machine).unwrap_err().is_validation());

    let record = plant.production.submit(base).expect("valid submission");
    assert!((record.details[0].compliance_pct - 4.0).abs() < 1e-9);
}
