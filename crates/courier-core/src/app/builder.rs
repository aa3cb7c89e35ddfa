//! WorkerBuilder - FulfillmentWorker の構築とワイヤリング
//!
//! store と queue は必須。clock / tracking は省略するとシステム時刻と乱数を使う。
//! 不足は build() 時に BuildError で返す（Fail-fast）。

use std::sync::Arc;

use crate::app::config::WorkerConfig;
use crate::app::worker_loop::FulfillmentWorker;
use crate::ports::{
    Clock, MessageQueue, RandomTrackingNumbers, ShipmentStore, SystemClock,
    TrackingNumberGenerator,
};

/// BuildError は Worker 構築時のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("no shipment store was configured")]
    MissingStore,

    #[error("no message queue was configured")]
    MissingQueue,
}

/// WorkerBuilder は FulfillmentWorker を構築
///
/// # 使用例
/// ```ignore
/// let worker = WorkerBuilder::new(config.worker.clone())
///     .store(backend.store())
///     .queue(Arc::new(queue))
///     .build()?;
/// ```
pub struct WorkerBuilder {
    config: WorkerConfig,
    store: Option<Arc<dyn ShipmentStore>>,
    queue: Option<Arc<dyn MessageQueue>>,
    clock: Arc<dyn Clock>,
    tracking: Arc<dyn TrackingNumberGenerator>,
}

impl WorkerBuilder {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            store: None,
            queue: None,
            clock: Arc::new(SystemClock),
            tracking: Arc::new(RandomTrackingNumbers),
        }
    }

    pub fn store(mut self, store: Arc<dyn ShipmentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn queue(mut self, queue: Arc<dyn MessageQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn tracking_numbers(mut self, tracking: Arc<dyn TrackingNumberGenerator>) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn build(self) -> Result<FulfillmentWorker, BuildError> {
        let store = self.store.ok_or(BuildError::MissingStore)?;
        let queue = self.queue.ok_or(BuildError::MissingQueue)?;
        Ok(FulfillmentWorker::new(
            store,
            queue,
            self.clock,
            self.tracking,
            self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryCollection, InMemoryMessageQueue, KeyedUpdateStore};

    fn store() -> Arc<dyn ShipmentStore> {
        Arc::new(KeyedUpdateStore::new(
            InMemoryCollection::new(),
            InMemoryCollection::new(),
        ))
    }

    #[test]
    fn build_success() {
        let worker = WorkerBuilder::new(WorkerConfig::new("shipping"))
            .store(store())
            .queue(Arc::new(InMemoryMessageQueue::new()))
            .build()
            .unwrap();
        assert_eq!(worker.config().queue_name, "shipping");
    }

    #[test]
    fn build_without_store_fails() {
        let result = WorkerBuilder::new(WorkerConfig::new("shipping"))
            .queue(Arc::new(InMemoryMessageQueue::new()))
            .build();
        assert!(matches!(result, Err(BuildError::MissingStore)));
    }

    #[test]
    fn build_without_queue_fails() {
        let result = WorkerBuilder::new(WorkerConfig::new("shipping"))
            .store(store())
            .build();
        assert!(matches!(result, Err(BuildError::MissingQueue)));
    }
}
