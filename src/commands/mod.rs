pub mod catalog;
pub mod dashboard;
pub mod metrics;
pub mod production;
pub mod reports;
pub mod session;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, warn};

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::operator::Role;
use crate::models::session::Session;
use crate::services::catalog_service::CatalogService;
use crate::services::dashboard_service::{DashboardRefresher, DashboardService};
use crate::services::metrics_service::MetricsService;
use crate::services::production_service::ProductionService;
use crate::services::realtime::ChangeFeed;
use crate::services::report_service::ReportService;
use crate::services::session_service::{AuthService, SessionContext, SessionStore};

/// Everything the command layer needs, cheap to clone into blocking tasks.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    db_pool: DbPool,
    feed: ChangeFeed,
    catalog_service: Arc<CatalogService>,
    production_service: Arc<ProductionService>,
    metrics_service: Arc<MetricsService>,
    report_service: Arc<ReportService>,
    dashboard_refresher: DashboardRefresher,
    auth_service: Arc<AuthService>,
    session_context: Arc<SessionContext>,
}

impl AppState {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let db_pool = DbPool::new(config.database_path())?;
        Self::with_pool(config, db_pool)
    }

    pub fn with_pool(config: AppConfig, db_pool: DbPool) -> AppResult<Self> {
        let config = Arc::new(config);
        let feed = ChangeFeed::new();

        let catalog_service = Arc::new(CatalogService::new(db_pool.clone(), feed.clone()));
        let production_service = Arc::new(ProductionService::new(db_pool.clone(), feed.clone()));
        let metrics_service = Arc::new(MetricsService::new(db_pool.clone()));
        let report_service = Arc::new(ReportService::new(db_pool.clone(), config.reports_path())?);

        // Validated once here so the refresher's clock cannot fail later.
        let tz = config.tz()?;
        let dashboard_service = Arc::new(DashboardService::new(db_pool.clone()));
        let dashboard_refresher = DashboardRefresher::new(dashboard_service, move || {
            Utc::now().with_timezone(&tz).date_naive()
        });

        let auth_service = Arc::new(AuthService::new(db_pool.clone()));
        let session_context = Arc::new(SessionContext::new(SessionStore::new(
            config.session_path(),
        )));
        session_context.load()?;

        Ok(Self {
            config,
            db_pool,
            feed,
            catalog_service,
            production_service,
            metrics_service,
            report_service,
            dashboard_refresher,
            auth_service,
            session_context,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }

    pub fn feed(&self) -> ChangeFeed {
        self.feed.clone()
    }

    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog_service)
    }

    pub fn production(&self) -> Arc<ProductionService> {
        Arc::clone(&self.production_service)
    }

    pub fn metrics(&self) -> Arc<MetricsService> {
        Arc::clone(&self.metrics_service)
    }

    pub fn reports(&self) -> Arc<ReportService> {
        Arc::clone(&self.report_service)
    }

    pub fn dashboard(&self) -> DashboardRefresher {
        self.dashboard_refresher.clone()
    }

    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth_service)
    }

    pub fn session(&self) -> Arc<SessionContext> {
        Arc::clone(&self.session_context)
    }

    pub fn today(&self) -> AppResult<NaiveDate> {
        self.config.local_date(Utc::now())
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

const GENERIC_FAILURE: &str = "No se pudo completar la operación. Intente de nuevo.";

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => {
                CommandError::new("NOT_FOUND", "El registro solicitado no existe", None)
            }
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::Unauthorized => {
                CommandError::new("UNAUTHORIZED", "Credenciales inválidas", None)
            }
            AppError::Forbidden { message } => CommandError::new("FORBIDDEN", message, None),
            AppError::Export { format, message } => {
                error!(target: "app::command", format, %message, "export error in command");
                CommandError::new(
                    "EXPORT_FAILED",
                    "No se pudo generar el archivo",
                    Some(serde_json::json!({ "format": format })),
                )
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", GENERIC_FAILURE, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", GENERIC_FAILURE, None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", GENERIC_FAILURE, None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", GENERIC_FAILURE, None)
            }
        }
    }
}

/// Runs synchronous service code off the async executor.
pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| {
            error!(target: "app::command", error = %err, "blocking task failed");
            CommandError::new("UNKNOWN", GENERIC_FAILURE, None)
        })?
        .map_err(CommandError::from)
}

pub(crate) fn require_session(state: &AppState) -> CommandResult<Session> {
    state.session().require().map_err(CommandError::from)
}

pub(crate) fn require_role(
    session: &Session,
    allowed: impl Fn(&Role) -> bool,
    action: &str,
) -> CommandResult<()> {
    if allowed(&session.role) {
        return Ok(());
    }
    warn!(
        target: "app::command",
        operator_id = session.operator_id,
        role = session.role.as_str(),
        action,
        "role not allowed"
    );
    Err(AppError::forbidden(format!("su rol no permite {action}")).into())
}
