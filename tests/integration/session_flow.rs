use prodtrack_app_lib::commands::{catalog, metrics, reports, session, AppState};
use prodtrack_app_lib::config::AppConfig;
use prodtrack_app_lib::models::operator::{OperatorCreateInput, Role};
use prodtrack_app_lib::models::report::{ExportOutcome, ReportGrouping, ReportParams};
use prodtrack_app_lib::models::session::LoginInput;
use tempfile::tempdir;

fn login(cedula: &str, password: &str) -> LoginInput {
    LoginInput {
        cedula: cedula.into(),
        password: password.into(),
    }
}

fn february() -> ReportParams {
    ReportParams {
        from: "2024-02-01".into(),
        to: "2024-02-29".into(),
        grouping: ReportGrouping::Category,
        category: None,
    }
}

#[tokio::test]
async fn login_persists_session_and_gates_roles() {
    let dir = tempdir().expect("temp dir");
    let state = AppState::new(AppConfig::with_data_dir(dir.path())).expect("state");

    // Nothing is reachable before signing in.
    let err = reports::report_export(&state, february()).await.unwrap_err();
    assert_eq!(err.code, "UNAUTHORIZED");

    catalog::admin_bootstrap(&state, "9000".into(), "Jefe de planta".into(), "admin-2024".into())
        .await
        .expect("bootstrap admin");
    let again = catalog::admin_bootstrap(&state, "9001".into(), "Otro".into(), "x".into())
        .await
        .unwrap_err();
    assert_eq!(again.code, "CONFLICT");

    let wrong = session::session_login(&state, login("9000", "incorrecta"))
        .await
        .unwrap_err();
    assert_eq!(wrong.code, "UNAUTHORIZED");
    let unknown = session::session_login(&state, login("1234", "admin-2024"))
        .await
        .unwrap_err();
    assert_eq!(unknown.message, wrong.message);

    let admin = session::session_login(&state, login("9000", "admin-2024"))
        .await
        .expect("admin login");
    assert_eq!(admin.role, Role::Admin);

    catalog::operator_create(
        &state,
        OperatorCreateInput {
            cedula: "1001".into(),
            full_name: "Juan Pérez".into(),
            role: Role::Operator,
            password: "turno-2024".into(),
        },
    )
    .await
    .expect("create operator");

    let outcome = reports::report_export(&state, february()).await.expect("admin export");
    assert!(matches!(outcome, ExportOutcome::NoData { .. }));

    // A fresh state over the same directory picks the session back up.
    let reopened = AppState::new(AppConfig::with_data_dir(dir.path())).expect("reopen");
    assert_eq!(session::session_current(&reopened), Some(admin));

    session::session_login(&reopened, login("1001", "turno-2024"))
        .await
        .expect("operator login");
    let forbidden = reports::report_export(&reopened, february()).await.unwrap_err();
    assert_eq!(forbidden.code, "FORBIDDEN");

    let others = metrics::metrics_summary_fetch(
        &reopened,
        metrics::MetricsQuery {
            cedula: Some("9000".into()),
            from: "2024-03-01".into(),
            to: "2024-03-31".into(),
            denominator: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(others.code, "FORBIDDEN");

    let own = metrics::metrics_summary_fetch(
        &reopened,
        metrics::MetricsQuery {
            cedula: None,
            from: "2024-03-01".into(),
            to: "2024-03-31".into(),
            denominator: None,
        },
    )
    .await
    .expect("own metrics");
    assert_eq!(own.cedula, "1001");
    assert_eq!(own.worked_days, 0);

    session::session_logout(&reopened).await.expect("logout");
    assert!(session::session_current(&reopened).is_none());
    assert_eq!(session::session_require(&reopened).unwrap_err().code, "UNAUTHORIZED");
}

#[tokio::test]
async fn wide_ranges_fail_validation_before_running() {
    let dir = tempdir().expect("temp dir");
    let state = AppState::new(AppConfig::with_data_dir(dir.path())).expect("state");
    catalog::admin_bootstrap(&state, "9000".into(), "Jefe de planta".into(), "admin-2024".into())
        .await
        .expect("bootstrap admin");
    session::session_login(&state, login("9000", "admin-2024"))
        .await
        .expect("login");

    let mut params = february();
    params.from = "2024-01-01".into();
    params.to = "2024-05-01".into();
    let err = reports::report_export(&state, params).await.unwrap_err();
    assert_eq!(err.code, "VALIDATION_ERROR");
    assert_eq!(err.details.expect("details")["maxMonths"], 3);
}
