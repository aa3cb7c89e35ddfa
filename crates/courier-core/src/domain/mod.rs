//! Domain model (IDs, requests, shipments, status, errors).
//!
//! 外部 I/O を持たない純粋な型と関数だけを置きます。
//! - ids: OrderId（業務キー）と ULID ベースの MessageId / LockToken
//! - order: 注文ステータス（整数コード）
//! - request: キューに載る ShippingRequest
//! - shipment: Worker が生成する ShipmentRecord
//! - duration: 郵便番号 → 輸送時間の見積もり
//! - state: メッセージ単位の処理状態
//! - errors: エラー型と分類

pub mod duration;
pub mod errors;
pub mod ids;
pub mod order;
pub mod request;
pub mod shipment;
pub mod state;

pub use self::duration::{DurationBand, estimate_transit, estimate_transit_with, normalize_postal_code};
pub use self::errors::{QueueError, StorageError};
pub use self::ids::{LockToken, MessageId, OrderId};
pub use self::order::OrderStatus;
pub use self::request::{PayloadError, ShippingInfo, ShippingRequest};
pub use self::shipment::ShipmentRecord;
pub use self::state::{Disposition, FulfillmentState};
