//! settler-core
//!
//! Settlement core for peer-to-peer payments: a lock-free reconciliation
//! queue and the daemon that drains it, aligning locally stored payments with
//! an eventually consistent payment gateway.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, PaymentStatus, PaymentTask, Payment, Decision, errors）
//! - **ports**: 抽象化レイヤー（PaymentStore, GatewayClient, IdentityResolver, Clock, IdGenerator）
//! - **queue**: TaskQueue trait + Michael–Scott LockFreeQueue + RetryPolicy
//! - **app**: PaymentService（同期パス）, ReconciliationDaemon, SettlerBuilder
//! - **impls**: 開発用・テスト用の実装（InMemoryPaymentStore, SimulatedGateway など）
//! - **config**: Settings（defaults → file → env）
//! - **error**: SettleError

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

pub use crate::app::{DaemonHandle, PaymentService, ReconciliationDaemon, SettlerBuilder};
pub use crate::error::SettleError;
