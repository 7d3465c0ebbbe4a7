use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::db::repositories::machine_repository::MachineRepository;
use crate::db::repositories::operator_repository::OperatorRepository;
use crate::db::repositories::production_repository::ProductionRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::dashboard::{DashboardSnapshot, RecentRecord, RefreshOutcome};
use crate::models::report::MISSING_ENTITY;
use crate::services::realtime::ChangeSubscription;

const RECENT_LIMIT: usize = 10;

pub struct DashboardService {
    db: DbPool,
}

impl DashboardService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn snapshot(&self, today: NaiveDate) -> AppResult<DashboardSnapshot> {
        let (records_today, active_operators, machines, recent) =
            self.db.with_connection(|conn| {
                Ok((
                    ProductionRepository::count_on(conn, today)?,
                    OperatorRepository::count_active(conn)?,
                    MachineRepository::count(conn)?,
                    ProductionRepository::list_recent(conn, RECENT_LIMIT)?,
                ))
            })?;

        let recent = recent
            .into_iter()
            .map(|record| RecentRecord {
                id: record.id,
                date: record.date,
                shift: record.shift.clone(),
                machine: record
                    .machine
                    .as_ref()
                    .map(|machine| machine.name.clone())
                    .unwrap_or_else(|| MISSING_ENTITY.to_string()),
                operator: record
                    .operator
                    .as_ref()
                    .map(|operator| operator.full_name.clone())
                    .unwrap_or_else(|| MISSING_ENTITY.to_string()),
                total_quantity: record.details.iter().map(|detail| detail.quantity).sum(),
            })
            .collect();

        Ok(DashboardSnapshot {
            date: today,
            records_today,
            active_operators,
            machines,
            recent,
            generated_at: Utc::now().to_rfc3339(),
        })
    }
}

/// Keeps the latest dashboard snapshot. Overlapping refreshes are dropped,
/// not queued.
#[derive(Clone)]
pub struct DashboardRefresher {
    service: Arc<DashboardService>,
    today: Arc<dyn Fn() -> NaiveDate + Send + Sync>,
    busy: Arc<AtomicBool>,
    latest: Arc<RwLock<Option<DashboardSnapshot>>>,
}

impl DashboardRefresher {
    pub fn new(
        service: Arc<DashboardService>,
        today: impl Fn() -> NaiveDate + Send + Sync + 'static,
    ) -> Self {
        Self {
            service,
            today: Arc::new(today),
            busy: Arc::new(AtomicBool::new(false)),
            latest: Arc::new(RwLock::new(None)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn refresh(&self) -> AppResult<RefreshOutcome> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(target: "app::dashboard", "refresh already running, skipped");
            return Ok(RefreshOutcome::Skipped);
        }

        let _guard = BusyGuard(&self.busy);
        let snapshot = self.service.snapshot((self.today)())?;
        let mut latest = self
            .latest
            .write()
            .map_err(|_| AppError::other("dashboard cache poisoned"))?;
        *latest = Some(snapshot);
        Ok(RefreshOutcome::Refreshed)
    }

    pub fn latest(&self) -> Option<DashboardSnapshot> {
        self.latest.read().ok().and_then(|guard| guard.clone())
    }

    /// Refreshes once per change event until the subscription ends. Returns
    /// how many refreshes actually ran.
    pub async fn listen(&self, mut subscription: ChangeSubscription) -> usize {
        let mut refreshed = 0;
        while let Some(event) = subscription.next().await {
            let refresher = self.clone();
            let outcome = tokio::task::spawn_blocking(move || refresher.refresh()).await;
            match outcome {
                Ok(Ok(RefreshOutcome::Refreshed)) => refreshed += 1,
                Ok(Ok(RefreshOutcome::Skipped)) => {}
                Ok(Err(err)) => warn!(
                    target: "app::dashboard",
                    table = event.table.as_str(),
                    error = %err,
                    "dashboard refresh failed"
                ),
                Err(err) => warn!(target: "app::dashboard", error = %err, "refresh task aborted"),
            }
        }
        info!(
            target: "app::dashboard",
            table = subscription.table().as_str(),
            refreshed,
            "change subscription closed"
        );
        refreshed
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn refresher() -> (tempfile::TempDir, DashboardRefresher) {
        let dir = tempdir().unwrap();
        let pool = DbPool::new(dir.path().join("dashboard.sqlite")).unwrap();
        let service = Arc::new(DashboardService::new(pool));
        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        (dir, DashboardRefresher::new(service, move || today))
    }

    #[test]
    fn refresh_stores_latest_snapshot() {
        let (_dir, refresher) = refresher();
        assert!(refresher.latest().is_none());

        assert_eq!(refresher.refresh().unwrap(), RefreshOutcome::Refreshed);
        let snapshot = refresher.latest().unwrap();
        assert_eq!(snapshot.records_today, 0);
        assert!(snapshot.recent.is_empty());
        assert!(!refresher.is_busy());
    }

    #[test]
    fn refresh_is_skipped_while_busy() {
        let (_dir, refresher) = refresher();
        refresher.busy.store(true, Ordering::Release);

        assert_eq!(refresher.refresh().unwrap(), RefreshOutcome::Skipped);
        assert!(refresher.latest().is_none());

        refresher.busy.store(false, Ordering::Release);
        assert_eq!(refresher.refresh().unwrap(), RefreshOutcome::Refreshed);
    }
}
