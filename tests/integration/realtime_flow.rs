use std::time::Duration;

use prodtrack_app_lib::commands::{catalog, dashboard, production, session, AppState};
use prodtrack_app_lib::config::AppConfig;
use prodtrack_app_lib::models::dashboard::RefreshOutcome;
use prodtrack_app_lib::models::product::{ProductCreateInput, ProductKind};
use prodtrack_app_lib::models::production::{ProductionCreateInput, ProductionDetailInput};
use prodtrack_app_lib::models::session::LoginInput;
use prodtrack_app_lib::services::realtime::{ChangeKind, ChangeTable};
use prodtrack_app_lib::utils::dates::to_iso;
use tempfile::tempdir;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn production_changes_refresh_the_dashboard() {
    let dir = tempdir().expect("temp dir");
    let state = AppState::new(AppConfig::with_data_dir(dir.path())).expect("state");

    let admin = catalog::admin_bootstrap(
        &state,
        "9000".into(),
        "Jefe de planta".into(),
        "admin-2024".into(),
    )
    .await
    .expect("bootstrap");
    session::session_login(
        &state,
        LoginInput {
            cedula: "9000".into(),
            password: "admin-2024".into(),
        },
    )
    .await
    .expect("login");

    let machine = catalog::machine_create(&state, "Inyectora 1".into(), Some("Inyección".into()))
        .await
        .expect("machine");
    let product = catalog::product_create(
        &state,
        ProductCreateInput {
            name: "Esfera 8cm".into(),
            kind: ProductKind::General,
            target_8h: Some(250.0),
            ..Default::default()
        },
    )
    .await
    .expect("product");

    assert_eq!(
        dashboard::dashboard_refresh(&state).await.expect("refresh"),
        RefreshOutcome::Refreshed
    );
    assert_eq!(state.dashboard().latest().expect("snapshot").records_today, 0);

    let watcher = dashboard::dashboard_watch(&state);

    let today = state.today().expect("today");
    production::production_submit(
        &state,
        ProductionCreateInput {
            date: to_iso(today),
            shift: "8 horas".into(),
            machine_id: machine.id,
            operator_id: admin.id,
            is_assistant: false,
            assistant_ids: vec![],
            details: vec![ProductionDetailInput {
                product_id: product.id,
                design_id: None,
                quantity: 200.0,
            }],
            notes: None,
        },
    )
    .await
    .expect("submit");

    let mut refreshed = None;
    for _ in 0..50 {
        if let Some(snapshot) = state.dashboard().latest() {
            if snapshot.records_today == 1 {
                refreshed = Some(snapshot);
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let snapshot = refreshed.expect("dashboard refreshed after insert");
    assert_eq!(snapshot.recent.len(), 1);
    assert_eq!(snapshot.recent[0].machine, "Inyectora 1");
    assert_eq!(snapshot.recent[0].total_quantity, 200.0);

    watcher.abort();
}

#[tokio::test]
async fn subscriptions_only_see_their_table() {
    let dir = tempdir().expect("temp dir");
    let state = AppState::new(AppConfig::with_data_dir(dir.path())).expect("state");
    let mut machines = state.feed().subscribe(ChangeTable::Machines);
    let mut products = state.feed().subscribe(ChangeTable::Products);

    catalog::admin_bootstrap(&state, "9000".into(), "Jefe".into(), "admin-2024".into())
        .await
        .expect("bootstrap");
    session::session_login(
        &state,
        LoginInput {
            cedula: "9000".into(),
            password: "admin-2024".into(),
        },
    )
    .await
    .expect("login");

    let machine = catalog::machine_create(&state, "Sopladora".into(), None)
        .await
        .expect("machine");
    catalog::machine_delete(&state, machine.id).await.expect("delete");

    let created = machines.next().await.expect("insert event");
    assert_eq!(created.kind, ChangeKind::Insert);
    assert_eq!(created.row_id, Some(machine.id));
    let deleted = machines.next().await.expect("delete event");
    assert_eq!(deleted.kind, ChangeKind::Delete);

    let quiet = tokio::time::timeout(Duration::from_millis(100), products.next()).await;
    assert!(quiet.is_err(), "product subscription saw a machine event");
}
