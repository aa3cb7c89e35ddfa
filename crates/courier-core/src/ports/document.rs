//! Document store ports - 2 種類のクエリモデル
//!
//! ShipmentStore の各実装が下に敷くドキュメントストアの抽象です。
//! ネットワークドライバは外部の協力者で、このクレートには in-memory 実装だけを置きます。
//!
//! - **DocumentContainer**: パーティション + 内部 id で管理（Cosmos SQL API 型）
//!   - 検索はページング付きのクエリ
//!   - 更新は内部 id 指定の部分パッチ
//! - **DocumentCollection**: フィールドフィルタで直接更新（Mongo 型）

use async_trait::async_trait;
use serde_json::{Map, Value};

/// DocumentError はドキュメントストアのエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("document {0} not found")]
    NotFound(String),

    #[error("document {0} already exists")]
    Conflict(String),

    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DocumentError {
    fn from(e: serde_json::Error) -> Self {
        DocumentError::Serialization(e.to_string())
    }
}

/// 単一フィールドの等値フィルタ
///
/// `SELECT * FROM o WHERE o.orderId = @orderId` や `{"orderId": ...}` に相当。
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    field: String,
    value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn matches(&self, doc: &Value) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

/// 部分パッチ操作
///
/// `path` は JSON Pointer（例: `/status`, `/shipment/trackingNumber`）。
/// - Set: 無ければ追加、あれば置換（親は存在している必要がある）
/// - Replace: 既存フィールドの置換（無ければエラー）
/// - Remove: 既存フィールドの削除（無ければエラー）
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOperation {
    Set { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl PatchOperation {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        PatchOperation::Set {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn replace(path: impl Into<String>, value: impl Into<Value>) -> Self {
        PatchOperation::Replace {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        PatchOperation::Remove { path: path.into() }
    }

    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Set { path, .. }
            | PatchOperation::Replace { path, .. }
            | PatchOperation::Remove { path } => path,
        }
    }
}

/// クエリ結果の 1 ページ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub items: Vec<Value>,
    /// 次ページがあれば Some
    pub continuation: Option<String>,
}

/// update_one の結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// パーティション + 内部 id で管理するコンテナ
#[async_trait]
pub trait DocumentContainer: Send + Sync {
    /// 新しいアイテムを作成（`id` が必須、重複は Conflict）
    async fn create_item(&self, partition: &str, item: Value) -> Result<(), DocumentError>;

    /// フィルタに一致するアイテムを 1 ページ分返す
    async fn query_items(
        &self,
        partition: &str,
        filter: &FieldFilter,
        continuation: Option<String>,
    ) -> Result<QueryPage, DocumentError>;

    /// 内部 id を指定して部分パッチ（全操作が成功するか、何も変わらないか）
    async fn patch_item(
        &self,
        partition: &str,
        id: &str,
        operations: &[PatchOperation],
    ) -> Result<(), DocumentError>;
}

/// フィールドフィルタで直接更新できるコレクション
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    async fn insert_one(&self, doc: Value) -> Result<(), DocumentError>;

    async fn find_one(&self, filter: &FieldFilter) -> Result<Option<Value>, DocumentError>;

    /// 最初に一致した 1 件に `$set` を適用
    async fn update_one(
        &self,
        filter: &FieldFilter,
        set: Map<String, Value>,
    ) -> Result<UpdateResult, DocumentError>;
}
