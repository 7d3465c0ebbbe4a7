use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub shift: String,
    pub machine: String,
    pub operator: String,
    pub total_quantity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub date: NaiveDate,
    pub records_today: i64,
    pub active_operators: i64,
    pub machines: i64,
    #[serde(default)]
    pub recent: Vec<RecentRecord>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RefreshOutcome {
    Refreshed,
    /// A refresh was already in flight; this request was dropped.
    Skipped,
}
