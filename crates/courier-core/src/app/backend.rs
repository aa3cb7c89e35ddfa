//! InMemoryBackend - 設定に従って開発用の ShipmentStore を組み立てる
//!
//! どちらの実装を使うかは起動時に 1 回だけ決める。
//! 実ドライバを使う場合も、同じように `Arc<dyn ShipmentStore>` を Worker に渡すだけ。

use std::sync::Arc;

use serde_json::{Value, json};
use ulid::Ulid;

use crate::app::config::{BackendConfig, DatabaseConfig};
use crate::domain::{OrderId, OrderStatus, StorageError};
use crate::impls::{InMemoryCollection, InMemoryContainer, KeyedUpdateStore, LookupPatchStore};
use crate::ports::shipment_store::fields;
use crate::ports::{DocumentCollection, DocumentContainer, FieldFilter, ShipmentStore};

/// 設定で選ばれた in-memory ストア
#[derive(Clone)]
pub enum InMemoryBackend {
    LookupPatch(Arc<LookupPatchStore<InMemoryContainer>>),
    KeyedUpdate(Arc<KeyedUpdateStore<InMemoryCollection>>),
}

impl InMemoryBackend {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        let backend = match &config.backend {
            BackendConfig::LookupPatch { partition, .. } => {
                InMemoryBackend::LookupPatch(Arc::new(LookupPatchStore::new(
                    InMemoryContainer::new(),
                    InMemoryContainer::new(),
                    partition.clone(),
                )))
            }
            BackendConfig::KeyedUpdate { .. } => InMemoryBackend::KeyedUpdate(Arc::new(
                KeyedUpdateStore::new(InMemoryCollection::new(), InMemoryCollection::new()),
            )),
        };
        tracing::info!(backend = %config.backend.kind(), database = %config.name, "document store selected");
        backend
    }

    pub fn store(&self) -> Arc<dyn ShipmentStore> {
        match self {
            InMemoryBackend::LookupPatch(store) => store.clone(),
            InMemoryBackend::KeyedUpdate(store) => store.clone(),
        }
    }

    /// Queued 状態の注文ドキュメントを作る（注文サービスの代わり）
    pub async fn seed_order(&self, order_id: &OrderId) -> Result<(), StorageError> {
        let mut doc = json!({
            (fields::ORDER_ID): order_id.as_str(),
            (fields::STATUS): OrderStatus::Queued.code(),
        });

        let result = match self {
            InMemoryBackend::LookupPatch(store) => {
                let partition = store.partition();
                if let Some(obj) = doc.as_object_mut() {
                    obj.insert(fields::INTERNAL_ID.into(), Value::String(Ulid::new().to_string()));
                    obj.insert(
                        partition.field_name().to_string(),
                        Value::String(partition.value.clone()),
                    );
                }
                store.orders().create_item(&partition.value, doc).await
            }
            InMemoryBackend::KeyedUpdate(store) => store.orders().insert_one(doc).await,
        };
        result.map_err(|e| StorageError::Transient(e.to_string()))
    }

    /// 業務キーで注文ドキュメントを読む
    pub async fn find_order(&self, order_id: &OrderId) -> Result<Option<Value>, StorageError> {
        let filter = FieldFilter::eq(fields::ORDER_ID, order_id.as_str());
        match self {
            InMemoryBackend::LookupPatch(store) => {
                let partition = &store.partition().value;
                let mut continuation = None;
                loop {
                    let page = store
                        .orders()
                        .query_items(partition, &filter, continuation)
                        .await
                        .map_err(|e| StorageError::Transient(e.to_string()))?;
                    if let Some(doc) = page.items.into_iter().next() {
                        return Ok(Some(doc));
                    }
                    match page.continuation {
                        Some(next) => continuation = Some(next),
                        None => return Ok(None),
                    }
                }
            }
            InMemoryBackend::KeyedUpdate(store) => store
                .orders()
                .find_one(&filter)
                .await
                .map_err(|e| StorageError::Transient(e.to_string())),
        }
    }

    /// 注文ドキュメントの status（整数コード）
    pub async fn order_status(&self, order_id: &OrderId) -> Result<Option<OrderStatus>, StorageError> {
        let doc = self.find_order(order_id).await?;
        Ok(doc
            .as_ref()
            .and_then(|doc| doc.get(fields::STATUS))
            .and_then(Value::as_u64)
            .and_then(|code| u8::try_from(code).ok())
            .and_then(|code| OrderStatus::try_from(code).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::{BackendKind, CourierConfig};
    use rstest::rstest;

    #[rstest]
    #[case::lookup_patch(BackendKind::LookupPatch)]
    #[case::keyed_update(BackendKind::KeyedUpdate)]
    #[tokio::test]
    async fn seeded_order_is_queued(#[case] kind: BackendKind) {
        let config = CourierConfig::development(kind);
        let backend = InMemoryBackend::from_config(&config.database);
        let order_id = OrderId::new("ORD-7");

        backend.seed_order(&order_id).await.unwrap();

        assert_eq!(
            backend.order_status(&order_id).await.unwrap(),
            Some(OrderStatus::Queued)
        );
        assert_eq!(
            backend.order_status(&OrderId::new("ORD-8")).await.unwrap(),
            None
        );
    }

    #[test]
    fn backend_follows_configuration() {
        let config = CourierConfig::development(BackendKind::LookupPatch);
        assert!(matches!(
            InMemoryBackend::from_config(&config.database),
            InMemoryBackend::LookupPatch(_)
        ));
    }
}
