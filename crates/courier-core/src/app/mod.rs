//! App - アプリケーション層
//!
//! ports を組み合わせて出荷処理を実装します。
//!
//! # 主要コンポーネント
//! - **CourierConfig**: 起動時に読む不変の設定
//! - **WorkerBuilder**: Worker の構築とワイヤリング
//! - **FulfillmentWorker**: 受信→出荷記録→完了→配達シミュレーション
//! - **ShippingIngress**: 出荷依頼をキューに載せる入口
//! - **InMemoryBackend**: 設定に従って開発用ストアを選ぶ

pub mod backend;
pub mod builder;
pub mod config;
pub mod ingress;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::backend::InMemoryBackend;
pub use self::builder::{BuildError, WorkerBuilder};
pub use self::config::{BackendKind, ConfigError, CourierConfig, WorkerConfig};
pub use self::ingress::{IngressAck, IngressError, ShippingIngress};
pub use self::worker_loop::{DeliveryHandle, FulfillmentWorker, Processed, WorkerHandle, simulate_delivery};
