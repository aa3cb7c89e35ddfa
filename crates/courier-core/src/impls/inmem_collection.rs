//! InMemoryCollection - フィルタ更新型コレクションの開発用実装
//!
//! # 実装詳細
//! - 挿入順の Vec<Value> を保持
//! - `_id` が無いドキュメントには ULID を採番
//! - `$set` のキーはドット区切りでネストしたフィールドを指せる（途中のオブジェクトは作成）

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::ports::{DocumentCollection, DocumentError, FieldFilter, UpdateResult};

const MONGO_ID: &str = "_id";

#[derive(Default)]
struct CollectionState {
    docs: Vec<Value>,
    unavailable: bool,
}

impl CollectionState {
    fn check_available(&self) -> Result<(), DocumentError> {
        if self.unavailable {
            return Err(DocumentError::Unavailable("collection is offline".into()));
        }
        Ok(())
    }
}

/// InMemoryCollection は Mongo 型のコレクションを模した実装
#[derive(Clone, Default)]
pub struct InMemoryCollection {
    state: Arc<Mutex<CollectionState>>,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// true の間、全操作が `DocumentError::Unavailable` を返す
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// 全ドキュメント（挿入順）
    pub async fn documents(&self) -> Vec<Value> {
        self.state.lock().await.docs.clone()
    }
}

#[async_trait]
impl DocumentCollection for InMemoryCollection {
    async fn insert_one(&self, mut doc: Value) -> Result<(), DocumentError> {
        let obj = doc
            .as_object_mut()
            .ok_or_else(|| DocumentError::BadRequest("document must be an object".into()))?;
        obj.entry(MONGO_ID)
            .or_insert_with(|| Value::String(Ulid::new().to_string()));

        let mut state = self.state.lock().await;
        state.check_available()?;
        let id = doc.get(MONGO_ID).cloned();
        if state.docs.iter().any(|d| d.get(MONGO_ID).cloned() == id) {
            return Err(DocumentError::Conflict(format!("{:?}", id)));
        }
        state.docs.push(doc);
        Ok(())
    }

    async fn find_one(&self, filter: &FieldFilter) -> Result<Option<Value>, DocumentError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state.docs.iter().find(|d| filter.matches(d)).cloned())
    }

    async fn update_one(
        &self,
        filter: &FieldFilter,
        set: Map<String, Value>,
    ) -> Result<UpdateResult, DocumentError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let Some(doc) = state.docs.iter_mut().find(|d| filter.matches(d)) else {
            return Ok(UpdateResult::default());
        };

        let mut updated = doc.clone();
        for (key, value) in set {
            set_dotted(&mut updated, &key, value)?;
        }
        let modified = u64::from(*doc != updated);
        *doc = updated;
        Ok(UpdateResult {
            matched_count: 1,
            modified_count: modified,
        })
    }
}

/// `a.b.c` に値を設定（途中のオブジェクトは作成）
fn set_dotted(doc: &mut Value, key: &str, value: Value) -> Result<(), DocumentError> {
    let mut parts: Vec<&str> = key.split('.').collect();
    let last = parts
        .pop()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| DocumentError::BadRequest(format!("empty field name in {key}")))?;

    let mut current = doc;
    for part in parts {
        let obj = current
            .as_object_mut()
            .ok_or_else(|| DocumentError::BadRequest(format!("{key} crosses a non-object")))?;
        current = obj
            .entry(part)
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let obj = current
        .as_object_mut()
        .ok_or_else(|| DocumentError::BadRequest(format!("{key} crosses a non-object")))?;
    obj.insert(last.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(pairs: Value) -> Map<String, Value> {
        pairs.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn update_one_reports_matched_and_modified() {
        let coll = InMemoryCollection::new();
        coll.insert_one(json!({"orderId": "ORD-1", "status": 1})).await.unwrap();
        let filter = FieldFilter::eq("orderId", "ORD-1");

        let first = coll.update_one(&filter, set(json!({"status": 2}))).await.unwrap();
        assert_eq!(first, UpdateResult { matched_count: 1, modified_count: 1 });

        let again = coll.update_one(&filter, set(json!({"status": 2}))).await.unwrap();
        assert_eq!(again, UpdateResult { matched_count: 1, modified_count: 0 });
    }

    #[tokio::test]
    async fn update_without_match_touches_nothing() {
        let coll = InMemoryCollection::new();
        coll.insert_one(json!({"orderId": "ORD-1"})).await.unwrap();

        let result = coll
            .update_one(&FieldFilter::eq("orderId", "ORD-2"), set(json!({"status": 2})))
            .await
            .unwrap();

        assert_eq!(result.matched_count, 0);
        assert_eq!(coll.documents().await.len(), 1);
        assert!(coll.documents().await[0].get("status").is_none());
    }

    #[tokio::test]
    async fn dotted_keys_update_nested_fields() {
        let coll = InMemoryCollection::new();
        coll.insert_one(json!({"orderId": "ORD-1", "shipment": {"trackingNumber": "TN-1"}}))
            .await
            .unwrap();
        let filter = FieldFilter::eq("orderId", "ORD-1");

        coll.update_one(&filter, set(json!({"shipment.shippingDuration": 30})))
            .await
            .unwrap();

        let doc = coll.find_one(&filter).await.unwrap().unwrap();
        assert_eq!(doc["shipment"]["trackingNumber"], "TN-1");
        assert_eq!(doc["shipment"]["shippingDuration"], 30);
    }

    #[tokio::test]
    async fn insert_assigns_object_id() {
        let coll = InMemoryCollection::new();
        coll.insert_one(json!({"orderId": "ORD-1"})).await.unwrap();
        let doc = &coll.documents().await[0];
        assert!(doc["_id"].is_string());
    }

    #[tokio::test]
    async fn unavailable_collection_fails() {
        let coll = InMemoryCollection::new();
        coll.set_unavailable(true).await;
        let err = coll
            .update_one(&FieldFilter::eq("orderId", "x"), Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Unavailable(_)));
    }
}
