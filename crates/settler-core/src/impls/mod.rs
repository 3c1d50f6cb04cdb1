//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports / queue の実装を含めます。
//!
//! # 含まれる実装
//! - **MutexQueue**: lock で守った TaskQueue
//! - **InMemoryPaymentStore**: 開発用の正本
//! - **SimulatedGateway**: pending → success と遷移する疑似ゲートウェイ
//! - **StaticIdentityResolver**: 固定のユーザー → 口座テーブル
//!
//! 本番用の実装（PostgreSQL, gateway REST client, identity gRPC client）は
//! 別クレートに配置します。

pub mod in_memory_store;
pub mod mutex_queue;
pub mod sim_gateway;
pub mod static_identity;

pub use self::in_memory_store::InMemoryPaymentStore;
pub use self::mutex_queue::MutexQueue;
pub use self::sim_gateway::{SimulatedGateway, TransferRecord};
pub use self::static_identity::StaticIdentityResolver;
