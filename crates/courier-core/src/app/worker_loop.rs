//! FulfillmentWorker - 受信→検証→出荷記録→完了→配達シミュレーション
//!
//! # フロー（1 メッセージ）
//! 1. MessageQueue::receive() でロック付きメッセージを取得
//! 2. ShippingRequest にデコード（失敗したら abandon、キュー側の再配送/dead-letter に任せる）
//! 3. 郵便番号から輸送時間を見積もり、追跡番号付きの ShipmentRecord を作る
//! 4. ShipmentStore::apply_shipment_update(InTransit)
//!    - 成功 / OrderNotFound → complete
//!    - それ以外 → abandon
//! 5. 別タスクで輸送時間だけ待ってから Delivered を書き込む
//!
//! 重要: complete は in-transit の書き込みが終わってからしか呼ばない。
//! 遅延タスクの失敗はログだけで、メッセージには影響しない。

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::app::config::WorkerConfig;
use crate::domain::{
    Disposition, FulfillmentState, OrderId, OrderStatus, QueueError, ShipmentRecord,
    ShippingRequest, StorageError, estimate_transit,
};
use crate::ports::{Clock, MessageLease, MessageQueue, ShipmentStore, TrackingNumberGenerator};

/// 1 メッセージ分の処理結果
#[derive(Debug)]
pub struct Processed {
    pub state: FulfillmentState,
    /// 配達シミュレーションのタスク（complete 済みの場合だけ）
    pub delivery: Option<DeliveryHandle>,
}

impl Processed {
    fn settled(state: FulfillmentState) -> Self {
        Self {
            state,
            delivery: None,
        }
    }
}

/// 配達シミュレーション中のタスク
///
/// drop しても止まらない（切り離されるだけ）。
#[derive(Debug)]
pub struct DeliveryHandle {
    order_id: OrderId,
    join: JoinHandle<FulfillmentState>,
}

impl DeliveryHandle {
    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// タスクの終了を待つ
    pub async fn wait(self) -> FulfillmentState {
        match self.join.await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(order_id = %self.order_id, error = %e, "delivery task did not finish");
                FulfillmentState::DeliverySimulating
            }
        }
    }
}

/// FulfillmentWorker は出荷キューを 1 本ずつ処理する
///
/// # Thread Safety
/// - 依存はすべて `Arc<dyn ...>`。遅延タスクは store だけを持って切り離される
pub struct FulfillmentWorker {
    store: Arc<dyn ShipmentStore>,
    queue: Arc<dyn MessageQueue>,
    clock: Arc<dyn Clock>,
    tracking: Arc<dyn TrackingNumberGenerator>,
    config: WorkerConfig,
}

impl FulfillmentWorker {
    pub fn new(
        store: Arc<dyn ShipmentStore>,
        queue: Arc<dyn MessageQueue>,
        clock: Arc<dyn Clock>,
        tracking: Arc<dyn TrackingNumberGenerator>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            clock,
            tracking,
            config,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// shutdown が true になるか、キューが閉じるまで処理を続ける
    ///
    /// 処理中のメッセージは最後まで処理してから抜ける。切り離した配達タスクは待たない。
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(queue = %self.config.queue_name, "waiting for messages");

        loop {
            if *shutdown.borrow() {
                break;
            }

            // receive は待つ可能性があるので shutdown と競合させる
            let received = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                received = self.queue.receive() => received,
            };

            match received {
                Ok(lease) => {
                    let processed = self.process(lease).await;
                    tracing::debug!(state = %processed.state, "message processed");
                }
                Err(QueueError::Closed) => {
                    tracing::info!(queue = %self.config.queue_name, "queue closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        backoff_secs = self.config.receive_backoff.as_secs(),
                        "error receiving message"
                    );
                    tokio::select! {
                        _ = shutdown.changed() => {}
                        _ = tokio::time::sleep(self.config.receive_backoff) => {}
                    }
                }
            }
        }

        tracing::info!(queue = %self.config.queue_name, "worker stopped");
    }

    /// 1 メッセージを処理して、complete / abandon まで済ませる
    pub async fn process(&self, lease: Box<dyn MessageLease>) -> Processed {
        let message_id = lease.message_id();
        let delivery_count = lease.delivery_count();

        let request = match ShippingRequest::from_slice(lease.body()) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(
                    message_id = %message_id,
                    delivery_count,
                    error = %e,
                    "invalid message format"
                );
                let state = FulfillmentState::Rejected {
                    reason: e.to_string(),
                };
                settle(lease, &state).await;
                return Processed::settled(state);
            }
        };

        tracing::info!(
            message_id = %message_id,
            order_id = %request.order_id,
            postal_code = %request.postal_code(),
            "processing shipment"
        );

        let record = self.prepare_shipment(&request);
        if let Err(e) = self.record_in_transit(&record).await {
            tracing::warn!(
                order_id = %record.order_id,
                delivery_count,
                error = %e,
                "failed to record shipment; abandoning message"
            );
            let state = FulfillmentState::Failed {
                error: e.to_string(),
            };
            settle(lease, &state).await;
            return Processed::settled(state);
        }

        settle(lease, &FulfillmentState::ShipmentRecorded).await;
        tracing::info!(
            order_id = %record.order_id,
            tracking_number = %record.tracking_number,
            duration_secs = record.duration_secs,
            "order in transit"
        );

        let delivery = self.spawn_delivery(record);
        Processed {
            state: FulfillmentState::DeliverySimulating,
            delivery: Some(delivery),
        }
    }

    /// 追跡番号・輸送時間・出荷時刻を決める
    pub fn prepare_shipment(&self, request: &ShippingRequest) -> ShipmentRecord {
        let postal_code = request.postal_code();
        ShipmentRecord::new(
            request.order_id.clone(),
            self.tracking.generate(&request.order_id),
            estimate_transit(postal_code),
            postal_code,
            self.clock.now(),
        )
    }

    async fn record_in_transit(&self, record: &ShipmentRecord) -> Result<(), StorageError> {
        absorb_not_found(
            self.store
                .apply_shipment_update(&record.order_id, OrderStatus::InTransit, record)
                .await,
        )?;

        if self.config.archive_shipments {
            self.store.record_shipment(record).await?;
        }
        Ok(())
    }

    fn spawn_delivery(&self, record: ShipmentRecord) -> DeliveryHandle {
        let order_id = record.order_id.clone();
        let store = Arc::clone(&self.store);
        let join = tokio::spawn(async move { simulate_delivery(store, record).await });
        DeliveryHandle { order_id, join }
    }

    /// バックグラウンドで run() を回す
    pub fn spawn(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move { self.run(shutdown_rx).await });
        WorkerHandle { shutdown_tx, join }
    }
}

/// 輸送時間だけ待ってから Delivered を書き込む
///
/// 書き込みに失敗しても再試行しない。注文は InTransit のまま残る。
pub async fn simulate_delivery(
    store: Arc<dyn ShipmentStore>,
    record: ShipmentRecord,
) -> FulfillmentState {
    tokio::time::sleep(record.transit_time()).await;

    let result = store
        .apply_shipment_update(&record.order_id, OrderStatus::Delivered, &record)
        .await;
    match absorb_not_found(result) {
        Ok(()) => {
            tracing::info!(
                order_id = %record.order_id,
                tracking_number = %record.tracking_number,
                "order delivered"
            );
            FulfillmentState::Delivered
        }
        Err(e) => {
            tracing::error!(
                order_id = %record.order_id,
                error = %e,
                "failed to record delivery; order left in transit"
            );
            FulfillmentState::DeliverySimulating
        }
    }
}

/// 注文が無いのは成功扱い
fn absorb_not_found(result: Result<(), StorageError>) -> Result<(), StorageError> {
    match result {
        Err(StorageError::OrderNotFound(order_id)) => {
            tracing::info!(order_id = %order_id, "order not found; nothing to update");
            Ok(())
        }
        other => other,
    }
}

async fn settle(lease: Box<dyn MessageLease>, state: &FulfillmentState) {
    let message_id = lease.message_id();
    let result = match state.disposition() {
        Some(Disposition::Completed) => lease.complete().await,
        Some(Disposition::Abandoned) => lease.abandon().await,
        // 未確定の状態では settle しない（ロック期限切れで再配送される）
        None => return,
    };
    if let Err(e) = result {
        tracing::warn!(message_id = %message_id, state = %state, error = %e, "failed to settle message");
    }
}

/// Worker handle.
/// - `request_shutdown()` で新しい受信を止める
/// - `shutdown_and_join()` で処理中のメッセージが終わるまで待つ
pub struct WorkerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn request_shutdown(&self) {
        // receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "worker task panicked");
        }
    }
}
