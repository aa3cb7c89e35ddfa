//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! Worker はここにある trait だけに依存し、具体的なストアやキューは
//! 起動時に差し込みます。
//!
//! - ShipmentStore: 注文ドキュメントへの書き込み（Persistence Port）
//! - DocumentContainer / DocumentCollection: ShipmentStore 実装の下に敷くストア
//! - MessageQueue / MessageSender: ロック付き受信のキュー
//! - Clock / TrackingNumberGenerator: テストで差し替える副作用

pub mod clock;
pub mod document;
pub mod message_queue;
pub mod shipment_store;
pub mod tracking;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::document::{
    DocumentCollection, DocumentContainer, DocumentError, FieldFilter, PatchOperation, QueryPage,
    UpdateResult,
};
pub use self::message_queue::{MessageLease, MessageQueue, MessageSender};
pub use self::shipment_store::ShipmentStore;
pub use self::tracking::{RandomTrackingNumbers, TrackingNumberGenerator};
