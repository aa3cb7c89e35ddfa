//! courier-core
//!
//! 出荷フルフィルメント Worker のコア部品。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, order, request, shipment, duration, state, errors）
//! - **ports**: 抽象化レイヤー（ShipmentStore, MessageQueue, DocumentContainer, Clock, など）
//! - **impls**: 実装（LookupPatchStore, KeyedUpdateStore と開発用 in-memory ストア・キュー）
//! - **app**: アプリケーションロジック（config, builder, worker_loop, ingress）
//! - **observability**: tracing の初期化とキューの集計

pub mod app;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
