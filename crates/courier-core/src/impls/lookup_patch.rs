//! LookupPatchStore - 業務キーで検索してから部分パッチする ShipmentStore
//!
//! # フロー（apply_shipment_update）
//! 1. `orderId == @orderId` のクエリを発行
//! 2. 最初に一致するまでページを辿り、内部 `id` を取り出す
//!    （全ページ見ても無ければ OrderNotFound）
//! 3. 内部 id に対して `/status` と `/shipment` の部分パッチ
//!
//! パッチの原子性はストア側（ドキュメント単位）に任せ、ここではロックしません。

use async_trait::async_trait;
use serde_json::Value;
use ulid::Ulid;

use crate::domain::{OrderId, OrderStatus, ShipmentRecord, StorageError};
use crate::ports::shipment_store::{fields, shipment_value, storage_error};
use crate::ports::{DocumentContainer, FieldFilter, PatchOperation, ShipmentStore};

/// パーティションキーの名前と、このサービスが使う値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionKey {
    pub key: String,
    pub value: String,
}

impl PartitionKey {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// `/storeId` のようなパス表記でもフィールド名だけを返す
    pub fn field_name(&self) -> &str {
        self.key.trim_start_matches('/')
    }
}

/// LookupPatchStore は orders / shipments の 2 コンテナを持つ
pub struct LookupPatchStore<C> {
    orders: C,
    shipments: C,
    partition: PartitionKey,
}

impl<C: DocumentContainer> LookupPatchStore<C> {
    pub fn new(orders: C, shipments: C, partition: PartitionKey) -> Self {
        Self {
            orders,
            shipments,
            partition,
        }
    }

    pub fn orders(&self) -> &C {
        &self.orders
    }

    pub fn shipments(&self) -> &C {
        &self.shipments
    }

    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    /// 業務キーから内部 id を引く
    pub async fn resolve_internal_id(&self, order_id: &OrderId) -> Result<String, StorageError> {
        let filter = FieldFilter::eq(fields::ORDER_ID, order_id.as_str());
        let mut continuation = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .orders
                .query_items(&self.partition.value, &filter, continuation)
                .await
                .map_err(|e| {
                    tracing::warn!(order_id = %order_id, error = %e, "order lookup query failed");
                    StorageError::Transient(e.to_string())
                })?;
            pages += 1;

            let found = page
                .items
                .iter()
                .find_map(|item| item.get(fields::INTERNAL_ID).and_then(Value::as_str));
            if let Some(id) = found {
                return Ok(id.to_string());
            }

            match page.continuation {
                Some(next) => continuation = Some(next),
                None => {
                    tracing::debug!(order_id = %order_id, pages, "order lookup exhausted all pages");
                    return Err(StorageError::OrderNotFound(order_id.clone()));
                }
            }
        }
    }
}

/// status と shipment をまとめて更新するパッチ
///
/// どちらも Set なので、同じ引数で繰り返しても結果は変わらない。
pub fn shipment_patch(
    status: OrderStatus,
    record: &ShipmentRecord,
) -> Result<Vec<PatchOperation>, StorageError> {
    Ok(vec![
        PatchOperation::set(format!("/{}", fields::STATUS), status.code()),
        PatchOperation::set(format!("/{}", fields::SHIPMENT), shipment_value(record)?),
    ])
}

#[async_trait]
impl<C: DocumentContainer> ShipmentStore for LookupPatchStore<C> {
    async fn record_shipment(&self, record: &ShipmentRecord) -> Result<(), StorageError> {
        let mut doc = shipment_value(record)?;
        if let Some(obj) = doc.as_object_mut() {
            obj.insert(fields::INTERNAL_ID.into(), Value::String(Ulid::new().to_string()));
            obj.entry(self.partition.field_name())
                .or_insert_with(|| Value::String(self.partition.value.clone()));
        }

        self.shipments
            .create_item(&self.partition.value, doc)
            .await
            .map_err(|e| storage_error(&record.order_id, e))
    }

    async fn apply_shipment_update(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        record: &ShipmentRecord,
    ) -> Result<(), StorageError> {
        let internal_id = self.resolve_internal_id(order_id).await?;
        let operations = shipment_patch(status, record)?;

        self.orders
            .patch_item(&self.partition.value, &internal_id, &operations)
            .await
            .map_err(|e| storage_error(order_id, e))?;

        tracing::debug!(order_id = %order_id, internal_id = %internal_id, status = %status, "order patched");
        Ok(())
    }
}
