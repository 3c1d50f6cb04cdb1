//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。各 trait は外部システム
//! （PostgreSQL, payment gateway, identity service）へのインターフェースで、
//! 実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - PaymentStore が正本（source of truth）
//! - GatewayClient は結果整合（eventually consistent）で、いつでも失敗しうる
//! - every call goes through `app::deadline` so nothing blocks forever

pub mod clock;
pub mod gateway;
pub mod id_generator;
pub mod identity;
pub mod payment_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::gateway::{GatewayClient, GatewayError, GatewayStatus, TransferStatus};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::identity::{IdentityError, IdentityResolver};
pub use self::payment_store::{PaymentStore, StatusUpdate, StoreError};
