//! ShipmentStore の約束を 2 つの実装で同じように確かめる

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rstest::rstest;
use serde_json::{Value, json};

use crate::domain::{OrderId, OrderStatus, ShipmentRecord, StorageError};
use crate::impls::{
    InMemoryCollection, InMemoryContainer, KeyedUpdateStore, LookupPatchStore, PartitionKey,
};
use crate::ports::{DocumentCollection, DocumentContainer, FieldFilter, ShipmentStore};

#[derive(Debug, Clone, Copy)]
enum Backend {
    LookupPatch,
    KeyedUpdate,
}

/// テスト用に注文の読み書きもできるストア
enum Harness {
    LookupPatch(Arc<LookupPatchStore<InMemoryContainer>>),
    KeyedUpdate(Arc<KeyedUpdateStore<InMemoryCollection>>),
}

impl Harness {
    async fn with_orders(backend: Backend, order_ids: &[&str]) -> Self {
        match backend {
            Backend::LookupPatch => {
                // ページ境界をまたぐように小さいページで
                let orders = InMemoryContainer::with_page_size(2);
                for (i, order_id) in order_ids.iter().enumerate() {
                    orders
                        .create_item(
                            "pets",
                            json!({"id": format!("doc-{i}"), "orderId": order_id, "status": 1, "storeId": "pets"}),
                        )
                        .await
                        .unwrap();
                }
                Harness::LookupPatch(Arc::new(LookupPatchStore::new(
                    orders,
                    InMemoryContainer::new(),
                    PartitionKey::new("/storeId", "pets"),
                )))
            }
            Backend::KeyedUpdate => {
                let orders = InMemoryCollection::new();
                for order_id in order_ids {
                    orders
                        .insert_one(json!({"orderId": order_id, "status": 1}))
                        .await
                        .unwrap();
                }
                Harness::KeyedUpdate(Arc::new(KeyedUpdateStore::new(
                    orders,
                    InMemoryCollection::new(),
                )))
            }
        }
    }

    fn store(&self) -> Arc<dyn ShipmentStore> {
        match self {
            Harness::LookupPatch(store) => store.clone(),
            Harness::KeyedUpdate(store) => store.clone(),
        }
    }

    async fn order(&self, order_id: &str) -> Value {
        match self {
            Harness::LookupPatch(store) => store
                .orders()
                .items("pets")
                .await
                .into_iter()
                .find(|doc| doc["orderId"] == order_id)
                .unwrap(),
            Harness::KeyedUpdate(store) => store
                .orders()
                .find_one(&FieldFilter::eq("orderId", order_id))
                .await
                .unwrap()
                .unwrap(),
        }
    }

    async fn order_count(&self) -> usize {
        match self {
            Harness::LookupPatch(store) => store.orders().items("pets").await.len(),
            Harness::KeyedUpdate(store) => store.orders().documents().await.len(),
        }
    }

    async fn shipment_count(&self) -> usize {
        match self {
            Harness::LookupPatch(store) => store.shipments().items("pets").await.len(),
            Harness::KeyedUpdate(store) => store.shipments().documents().await.len(),
        }
    }
}

fn record(order_id: &str, tracking: u32) -> ShipmentRecord {
    ShipmentRecord::new(
        OrderId::new(order_id),
        format!("TN-{tracking}-{order_id}"),
        25,
        "K1A0B1",
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
    )
}

#[rstest]
#[case::lookup_patch(Backend::LookupPatch)]
#[case::keyed_update(Backend::KeyedUpdate)]
#[tokio::test]
async fn repeated_update_is_idempotent(#[case] backend: Backend) {
    let harness = Harness::with_orders(backend, &["ORD-1", "ORD-2", "ORD-3"]).await;
    let store = harness.store();
    let shipment = record("ORD-3", 11);

    store
        .apply_shipment_update(&shipment.order_id, OrderStatus::InTransit, &shipment)
        .await
        .unwrap();
    let once = harness.order("ORD-3").await;

    store
        .apply_shipment_update(&shipment.order_id, OrderStatus::InTransit, &shipment)
        .await
        .unwrap();
    let twice = harness.order("ORD-3").await;

    assert_eq!(once, twice);
    assert_eq!(twice["status"], 2);
    assert_eq!(twice["shipment"]["trackingNumber"], "TN-11-ORD-3");
    assert_eq!(twice["shipment"]["estimatedArrive"], "2024-03-01T09:30:25Z");
}

#[rstest]
#[case::lookup_patch(Backend::LookupPatch)]
#[case::keyed_update(Backend::KeyedUpdate)]
#[tokio::test]
async fn delivered_keeps_tracking_number(#[case] backend: Backend) {
    let harness = Harness::with_orders(backend, &["ORD-1"]).await;
    let store = harness.store();
    let shipment = record("ORD-1", 5);

    store
        .apply_shipment_update(&shipment.order_id, OrderStatus::InTransit, &shipment)
        .await
        .unwrap();
    store
        .apply_shipment_update(&shipment.order_id, OrderStatus::Delivered, &shipment)
        .await
        .unwrap();

    let doc = harness.order("ORD-1").await;
    assert_eq!(doc["status"], 3);
    assert_eq!(doc["shipment"]["trackingNumber"], "TN-5-ORD-1");
}

#[rstest]
#[case::lookup_patch(Backend::LookupPatch)]
#[case::keyed_update(Backend::KeyedUpdate)]
#[tokio::test]
async fn missing_order_is_not_found_and_nothing_is_created(#[case] backend: Backend) {
    let harness = Harness::with_orders(backend, &["ORD-1", "ORD-2"]).await;
    let shipment = record("ORD-404", 1);

    let err = harness
        .store()
        .apply_shipment_update(&shipment.order_id, OrderStatus::InTransit, &shipment)
        .await
        .unwrap_err();

    assert_eq!(err, StorageError::OrderNotFound(OrderId::new("ORD-404")));
    assert_eq!(harness.order_count().await, 2);
}

#[rstest]
#[case::lookup_patch(Backend::LookupPatch)]
#[case::keyed_update(Backend::KeyedUpdate)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_to_distinct_orders_do_not_interfere(#[case] backend: Backend) {
    let ids: Vec<String> = (0..8).map(|i| format!("ORD-{i}")).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let harness = Harness::with_orders(backend, &refs).await;

    let mut joins = Vec::new();
    for (i, order_id) in ids.iter().enumerate() {
        let store = harness.store();
        let shipment = record(order_id, i as u32);
        joins.push(tokio::spawn(async move {
            store
                .apply_shipment_update(&shipment.order_id, OrderStatus::InTransit, &shipment)
                .await
        }));
    }
    for join in joins {
        join.await.unwrap().unwrap();
    }

    for (i, order_id) in ids.iter().enumerate() {
        let doc = harness.order(order_id).await;
        assert_eq!(doc["status"], 2);
        assert_eq!(doc["shipment"]["trackingNumber"], format!("TN-{i}-{order_id}"));
    }
}

#[rstest]
#[case::lookup_patch(Backend::LookupPatch)]
#[case::keyed_update(Backend::KeyedUpdate)]
#[tokio::test]
async fn record_shipment_leaves_orders_untouched(#[case] backend: Backend) {
    let harness = Harness::with_orders(backend, &["ORD-1"]).await;

    harness.store().record_shipment(&record("ORD-1", 3)).await.unwrap();

    assert_eq!(harness.shipment_count().await, 1);
    assert_eq!(harness.order("ORD-1").await["status"], 1);
}
