//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **LookupPatchStore**: 業務キー検索 → 部分パッチの ShipmentStore（Cosmos 型）
//! - **KeyedUpdateStore**: フィルタ更新の ShipmentStore（Mongo 型）
//! - **InMemoryContainer / InMemoryCollection**: 上記の下に敷く開発用ドキュメントストア
//! - **InMemoryMessageQueue**: ロック付き受信の開発用キュー
//!
//! ネットワークドライバ（Cosmos / Mongo / Service Bus）はこのクレートの外側です。

pub mod inmem_collection;
pub mod inmem_container;
pub mod inmem_queue;
pub mod keyed_update;
pub mod lookup_patch;
pub mod patch;

#[cfg(test)]
mod contract_tests;

// 主要な型を再エクスポート
pub use self::inmem_collection::InMemoryCollection;
pub use self::inmem_container::InMemoryContainer;
pub use self::inmem_queue::{InMemoryMessageQueue, MessageSnapshot, MessageState};
pub use self::keyed_update::KeyedUpdateStore;
pub use self::lookup_patch::{LookupPatchStore, PartitionKey};
pub use self::patch::apply_patch;
