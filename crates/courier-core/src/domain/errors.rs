//! Errors - エラー型
//!
//! - StorageError::Transient / QueueError: 一時的なエラー（キューに戻して再配送に任せる）
//! - StorageError::OrderNotFound: 再試行しても結果は変わらないので成功扱い

use thiserror::Error;

use super::ids::OrderId;

/// StorageError は ShipmentStore が返すエラー
///
/// `OrderNotFound` は呼び出し側で「成功扱い」にする約束です。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("transient store error: {0}")]
    Transient(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::OrderNotFound(_))
    }
}

/// QueueError はキュー操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("receive failed: {0}")]
    Receive(String),

    #[error("lock {0} is no longer held")]
    LockLost(String),

    #[error("queue is closed")]
    Closed,
}
