//! In-process change notification. Writers publish an event per affected
//! table; consumers subscribe per table and re-run their aggregation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

const FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    ProductionRecords,
    Operators,
    Machines,
    Products,
}

impl ChangeTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTable::ProductionRecords => "production_records",
            ChangeTable::Operators => "operators",
            ChangeTable::Machines => "machines",
            ChangeTable::Products => "products",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub kind: ChangeKind,
    pub row_id: Option<i64>,
    pub at: String,
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, table: ChangeTable, kind: ChangeKind, row_id: Option<i64>) {
        let event = ChangeEvent {
            table,
            kind,
            row_id,
            at: Utc::now().to_rfc3339(),
        };
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(target: "app::realtime", table = table.as_str(), receivers, "change published")
            }
            Err(_) => debug!(target: "app::realtime", table = table.as_str(), "change dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self, table: ChangeTable) -> ChangeSubscription {
        ChangeSubscription {
            table,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream of events for one table. Ends once every `ChangeFeed` handle is
/// dropped; subscribe again to resume.
pub struct ChangeSubscription {
    table: ChangeTable,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    pub fn table(&self) -> ChangeTable {
        self.table
    }

    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.table == self.table => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        target: "app::realtime",
                        table = self.table.as_str(),
                        skipped,
                        "subscriber lagged, skipping ahead"
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_filters_by_table() {
        let feed = ChangeFeed::new();
        let mut subscription = feed.subscribe(ChangeTable::ProductionRecords);

        feed.publish(ChangeTable::Machines, ChangeKind::Insert, Some(1));
        feed.publish(ChangeTable::ProductionRecords, ChangeKind::Insert, Some(9));

        let event = subscription.next().await.expect("event");
        assert_eq!(event.table, ChangeTable::ProductionRecords);
        assert_eq!(event.row_id, Some(9));
    }

    #[tokio::test]
    async fn subscription_ends_when_feed_is_dropped() {
        let feed = ChangeFeed::new();
        let mut subscription = feed.subscribe(ChangeTable::Operators);
        feed.publish(ChangeTable::Operators, ChangeKind::Update, None);
        drop(feed);

        assert!(subscription.next().await.is_some());
        assert!(subscription.next().await.is_none());
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let feed = ChangeFeed::new();
        assert_eq!(feed.subscriber_count(), 0);
        feed.publish(ChangeTable::Products, ChangeKind::Delete, Some(3));
    }
}
