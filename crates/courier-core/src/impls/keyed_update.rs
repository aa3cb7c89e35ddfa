//! KeyedUpdateStore - 業務キーのフィルタで直接更新する ShipmentStore
//!
//! `update_one({orderId}, {$set: {status, shipment}})` を 1 回発行するだけです。
//! 一致 0 件は OrderNotFound として返します（LookupPatchStore と同じ意味論）。

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::{OrderId, OrderStatus, ShipmentRecord, StorageError};
use crate::ports::shipment_store::{fields, shipment_value, storage_error};
use crate::ports::{DocumentCollection, FieldFilter, ShipmentStore};

/// KeyedUpdateStore は orders / shipments の 2 コレクションを持つ
pub struct KeyedUpdateStore<C> {
    orders: C,
    shipments: C,
}

impl<C: DocumentCollection> KeyedUpdateStore<C> {
    pub fn new(orders: C, shipments: C) -> Self {
        Self { orders, shipments }
    }

    pub fn orders(&self) -> &C {
        &self.orders
    }

    pub fn shipments(&self) -> &C {
        &self.shipments
    }
}

/// `$set` の中身
pub fn shipment_set(
    status: OrderStatus,
    record: &ShipmentRecord,
) -> Result<Map<String, Value>, StorageError> {
    let mut set = Map::new();
    set.insert(fields::STATUS.into(), Value::from(status.code()));
    set.insert(fields::SHIPMENT.into(), shipment_value(record)?);
    Ok(set)
}

#[async_trait]
impl<C: DocumentCollection> ShipmentStore for KeyedUpdateStore<C> {
    async fn record_shipment(&self, record: &ShipmentRecord) -> Result<(), StorageError> {
        let doc = shipment_value(record)?;
        self.shipments
            .insert_one(doc)
            .await
            .map_err(|e| storage_error(&record.order_id, e))
    }

    async fn apply_shipment_update(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        record: &ShipmentRecord,
    ) -> Result<(), StorageError> {
        let filter = FieldFilter::eq(fields::ORDER_ID, order_id.as_str());
        let set = shipment_set(status, record)?;

        let result = self
            .orders
            .update_one(&filter, set)
            .await
            .map_err(|e| storage_error(order_id, e))?;

        if result.matched_count == 0 {
            tracing::debug!(order_id = %order_id, "no order matched the update filter");
            return Err(StorageError::OrderNotFound(order_id.clone()));
        }

        tracing::debug!(
            order_id = %order_id,
            status = %status,
            modified = result.modified_count,
            "order updated"
        );
        Ok(())
    }
}
