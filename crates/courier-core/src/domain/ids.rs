//! Domain identifiers (strongly-typed IDs).
//!
//! # 2 種類の ID
//! - **OrderId**: 注文の業務キー（外部の注文サービスが採番する不透明な文字列）
//! - **Id<T>**: キュー内部で使う ULID ベースの ID（MessageId, LockToken）
//!
//! ## Phantom Type パターン
//! `Id<T>` で共通実装を提供しつつ、`T` はコンパイル時だけ使うマーカー型にして
//! MessageId と LockToken を混同できないようにしています。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// 注文の業務キー
///
/// ストレージ側が内部で割り当てるキー（Cosmos の `id` など）とは別物です。
/// 値の形式は検証しません（外部サービスの責務）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"msg-", "lock-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// ```ignore
/// let message_id: MessageId = Id::from(Ulid::new());
/// let lock: LockToken = Id::from(Ulid::new());
/// // message_id と lock は異なる型なので、混同できない
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 現在時刻 + 乱数で新しい ID を生成
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// キューメッセージのマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Message {}

impl IdMarker for Message {
    fn prefix() -> &'static str {
        "msg-"
    }
}

/// メッセージロックのマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lock {}

impl IdMarker for Lock {
    fn prefix() -> &'static str {
        "lock-"
    }
}

/// Identifier of a queued message (stable across redeliveries).
pub type MessageId = Id<Message>;

/// Identifier of one receive lock (changes on every delivery).
pub type LockToken = Id<Lock>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_marker_prefix() {
        let message_id = MessageId::generate();
        let lock = LockToken::generate();

        assert!(message_id.to_string().starts_with("msg-"));
        assert!(lock.to_string().starts_with("lock-"));
    }

    #[test]
    fn order_id_serializes_as_plain_string() {
        let order_id = OrderId::new("ORD-1");
        let json = serde_json::to_value(&order_id).unwrap();
        assert_eq!(json, serde_json::json!("ORD-1"));
        assert_eq!(order_id.to_string(), "ORD-1");
    }
}
