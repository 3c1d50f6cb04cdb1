//! App - アプリケーション層
//!
//! ports と queue を組み合わせて決済の照合ロジックを実装します。
//!
//! # 主要コンポーネント
//! - **PaymentService**: 同期パス（作成・リンク発行・状態照会・返金）
//! - **ReconciliationDaemon**: dequeue → classify → transition → requeue/retire
//! - **SettlerBuilder**: ワイヤリングと起動時検証
//! - **DaemonStats**: ループのカウンタ

pub mod builder;
pub mod daemon;
pub mod deadline;
pub mod service;
pub mod stats;

pub use self::builder::{BuildError, Settler, SettlerBuilder};
pub use self::daemon::{DaemonHandle, ReconciliationDaemon};
pub use self::deadline::with_deadline;
pub use self::service::PaymentService;
pub use self::stats::{DaemonCounts, DaemonStats};
