//! Domain identifiers (strongly-typed IDs).
//!
//! All identifiers in this system are opaque strings owned by someone else:
//! payment ids double as the gateway-side transaction label, user ids come from
//! the identity service, external account ids from the gateway. A single
//! generic `Id<T>` carries the string, and a zero-sized marker keeps a
//! `PaymentId` from being passed where a `UserId` is expected.
//!
//! ## Phantom Type パターン
//! `T` は実行時には使わない（PhantomData）マーカー型で、
//! コンパイル時の型安全性だけを提供します。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// Human-readable kind, used in error messages ("payment", "user", ...).
    fn kind() -> &'static str;
}

/// Generic string identifier.
///
/// Serialises as a bare string; the marker never reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    /// Build an id from a ULID (used for locally generated payment ids).
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self::new(ulid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn kind(&self) -> &'static str {
        T::kind()
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Payment {}

impl IdMarker for Payment {
    fn kind() -> &'static str {
        "payment"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn kind() -> &'static str {
        "user"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExternalAccount {}

impl IdMarker for ExternalAccount {
    fn kind() -> &'static str {
        "external account"
    }
}

/// Identifier of a payment; also the gateway transaction label.
pub type PaymentId = Id<Payment>;

/// Identifier of a user in the identity service.
pub type UserId = Id<User>;

/// Account identifier at the gateway that receives downstream transfers.
pub type ExternalAccountId = Id<ExternalAccount>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_their_raw_value() {
        let payment = PaymentId::new("p1");
        let user = UserId::from("u-42");

        assert_eq!(payment.to_string(), "p1");
        assert_eq!(user.as_str(), "u-42");
        assert_eq!(payment.kind(), "payment");
        assert_eq!(user.kind(), "user");
        // let _: UserId = payment; // <- does not compile
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = PaymentId::new("abc");
        let s = serde_json::to_string(&id).unwrap();
        assert_eq!(s, "\"abc\"");

        let back: PaymentId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn blank_ids_are_detected() {
        assert!(UserId::new("").is_blank());
        assert!(UserId::new("   ").is_blank());
        assert!(!UserId::new("u1").is_blank());
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<PaymentId>(), size_of::<String>());
    }
}
