//! ShipmentStore port - 注文ドキュメントへの書き込み口
//!
//! Worker はこの trait だけを見ます。実装は起動時の設定で 2 種類から選びます。
//! - **LookupPatchStore**: 業務キーで検索 → 内部 id に部分パッチ（Cosmos 型）
//! - **KeyedUpdateStore**: 業務キーのフィルタで 1 回更新（Mongo 型）

use async_trait::async_trait;

use crate::domain::{OrderId, OrderStatus, ShipmentRecord, StorageError};
use crate::ports::DocumentError;

/// ShipmentStore は出荷記録と注文ステータスを永続化
///
/// # 約束
/// - `apply_shipment_update` は冪等（同じ引数で何度呼んでも状態は 1 回と同じ）
/// - 注文が無ければ `StorageError::OrderNotFound`（呼び出し側は成功扱い）
/// - 接続・クエリ失敗は `StorageError::Transient`（呼び出し側が再試行を判断）
/// - 注文ドキュメントの作成・削除はしない
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// 出荷記録を独立したコレクションに保存
    async fn record_shipment(&self, record: &ShipmentRecord) -> Result<(), StorageError>;

    /// 注文の status と埋め込み shipment を更新
    async fn apply_shipment_update(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        record: &ShipmentRecord,
    ) -> Result<(), StorageError>;
}

/// 注文ドキュメント上のフィールド名
pub mod fields {
    /// 業務キー
    pub const ORDER_ID: &str = "orderId";
    /// ルートのステータス
    pub const STATUS: &str = "status";
    /// 埋め込み出荷記録（1 つのオブジェクトとして保存する）
    pub const SHIPMENT: &str = "shipment";
    /// 内部キー（Cosmos 型ストアが採番）
    pub const INTERNAL_ID: &str = "id";
}

/// ShipmentRecord を埋め込み用の JSON に変換
pub fn shipment_value(record: &ShipmentRecord) -> Result<serde_json::Value, StorageError> {
    serde_json::to_value(record)
        .map_err(|e| StorageError::Transient(format!("encode shipment for {}: {e}", record.order_id)))
}

/// ドキュメントストアのエラーを ShipmentStore のエラーに変換
///
/// 注文が見つからない場合だけ `OrderNotFound`、それ以外は呼び出し側の再試行判断に任せる。
pub fn storage_error(order_id: &OrderId, err: DocumentError) -> StorageError {
    match err {
        DocumentError::NotFound(_) => StorageError::OrderNotFound(order_id.clone()),
        other => StorageError::Transient(other.to_string()),
    }
}
