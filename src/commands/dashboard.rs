use tokio::task::JoinHandle;

use crate::models::dashboard::{DashboardSnapshot, RefreshOutcome};
use crate::services::realtime::ChangeTable;

use super::{require_session, run_blocking, AppState, CommandResult};

pub async fn dashboard_refresh(state: &AppState) -> CommandResult<RefreshOutcome> {
    require_session(state)?;
    let refresher = state.dashboard();
    run_blocking(move || refresher.refresh()).await
}

/// Latest snapshot, computing one first if none has been taken yet.
pub async fn dashboard_snapshot_fetch(state: &AppState) -> CommandResult<Option<DashboardSnapshot>> {
    require_session(state)?;
    let refresher = state.dashboard();
    if refresher.latest().is_none() {
        let worker = refresher.clone();
        run_blocking(move || worker.refresh()).await?;
    }
    Ok(refresher.latest())
}

/// Re-runs the dashboard refresh on every production change until the feed
/// closes.
pub fn dashboard_watch(state: &AppState) -> JoinHandle<usize> {
    let refresher = state.dashboard();
    let subscription = state.feed().subscribe(ChangeTable::ProductionRecords);
    tokio::spawn(async move { refresher.listen(subscription).await })
}
