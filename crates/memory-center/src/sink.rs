use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::warn;

use crate::record::KnowledgeRecord;
use crate::store::SharedKnowledgeStore;

/// Fire-and-forget writer in front of a knowledge store.
///
/// `submit` never waits for the write. `flush` waits for writes that are
/// still in flight, for callers that want them settled before exiting.
#[derive(Clone)]
pub struct KnowledgeSink {
    store: SharedKnowledgeStore,
    tracker: TaskTracker,
}

impl KnowledgeSink {
    pub fn new(store: SharedKnowledgeStore) -> Self {
        Self {
            store,
            tracker: TaskTracker::new(),
        }
    }

    pub fn store(&self) -> &SharedKnowledgeStore {
        &self.store
    }

    pub fn submit(&self, record: KnowledgeRecord) {
        if Handle::try_current().is_err() {
            warn!(id = %record.id, "knowledge write skipped (no async runtime)");
            return;
        }
        let store = self.store.clone();
        self.tracker.spawn(async move {
            let id = record.id.clone();
            if let Err(err) = store.store(record).await {
                warn!(target: "memory_center", error = %err, id, "knowledge write failed");
            }
        });
    }

    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
