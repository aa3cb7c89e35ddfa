//! InMemoryContainer - パーティション付きコンテナの開発用実装
//!
//! # 実装詳細
//! - パーティションごとに挿入順の Vec<Value> を保持
//! - クエリは `page_size` 件ずつ「走査」し、その範囲で一致したものだけ返す
//!   （一致 0 件でも continuation 付きの空ページが返り得る）
//! - パッチはドキュメント単位でアトミック（Mutex の中で適用）

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::patch::apply_patch;
use crate::ports::shipment_store::fields;
use crate::ports::{DocumentContainer, DocumentError, FieldFilter, PatchOperation, QueryPage};

/// 1 ページで走査するアイテム数の既定値
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Default)]
struct ContainerState {
    partitions: HashMap<String, Vec<Value>>,
    unavailable: bool,
}

impl ContainerState {
    fn check_available(&self) -> Result<(), DocumentError> {
        if self.unavailable {
            return Err(DocumentError::Unavailable("container is offline".into()));
        }
        Ok(())
    }
}

/// InMemoryContainer は Cosmos SQL API 型のコンテナを模した実装
#[derive(Clone)]
pub struct InMemoryContainer {
    state: Arc<Mutex<ContainerState>>,
    page_size: usize,
}

impl InMemoryContainer {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// ページングを確かめたいテスト用に走査幅を指定
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ContainerState::default())),
            page_size: page_size.max(1),
        }
    }

    /// true の間、全操作が `DocumentError::Unavailable` を返す
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// 内部 id でアイテムを読む
    pub async fn get_item(&self, partition: &str, id: &str) -> Option<Value> {
        let state = self.state.lock().await;
        state
            .partitions
            .get(partition)?
            .iter()
            .find(|item| has_id(item, id))
            .cloned()
    }

    /// パーティション内の全アイテム（挿入順）
    pub async fn items(&self, partition: &str) -> Vec<Value> {
        let state = self.state.lock().await;
        state.partitions.get(partition).cloned().unwrap_or_default()
    }
}

impl Default for InMemoryContainer {
    fn default() -> Self {
        Self::new()
    }
}

fn has_id(item: &Value, id: &str) -> bool {
    item.get(fields::INTERNAL_ID).and_then(Value::as_str) == Some(id)
}

#[async_trait]
impl DocumentContainer for InMemoryContainer {
    async fn create_item(&self, partition: &str, item: Value) -> Result<(), DocumentError> {
        let id = item
            .get(fields::INTERNAL_ID)
            .and_then(Value::as_str)
            .ok_or_else(|| DocumentError::BadRequest("item must have a string `id`".into()))?
            .to_string();

        let mut state = self.state.lock().await;
        state.check_available()?;
        let items = state.partitions.entry(partition.to_string()).or_default();
        if items.iter().any(|existing| has_id(existing, &id)) {
            return Err(DocumentError::Conflict(id));
        }
        items.push(item);
        Ok(())
    }

    async fn query_items(
        &self,
        partition: &str,
        filter: &FieldFilter,
        continuation: Option<String>,
    ) -> Result<QueryPage, DocumentError> {
        let offset = match continuation {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| DocumentError::BadRequest(format!("bad continuation: {token}")))?,
            None => 0,
        };

        let state = self.state.lock().await;
        state.check_available()?;
        let Some(items) = state.partitions.get(partition) else {
            return Ok(QueryPage::default());
        };

        let end = (offset + self.page_size).min(items.len());
        let window = items.get(offset..end).unwrap_or_default();
        let matched = window
            .iter()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        let continuation = (end < items.len()).then(|| end.to_string());

        Ok(QueryPage {
            items: matched,
            continuation,
        })
    }

    async fn patch_item(
        &self,
        partition: &str,
        id: &str,
        operations: &[PatchOperation],
    ) -> Result<(), DocumentError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let item = state
            .partitions
            .get_mut(partition)
            .and_then(|items| items.iter_mut().find(|item| has_id(item, id)))
            .ok_or_else(|| DocumentError::NotFound(id.to_string()))?;
        apply_patch(item, operations)
    }
}
