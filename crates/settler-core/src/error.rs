use std::time::Duration;

use thiserror::Error;

use crate::domain::{ErrorKind, PaymentId, PaymentStatus, ValidationError};
use crate::ports::{GatewayError, IdentityError, StoreError};

#[derive(Debug, Error)]
pub enum SettleError {
    #[error("invalid payment: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("{operation} timed out after {limit:?}")]
    Timeout {
        operation: &'static str,
        limit: Duration,
    },

    #[error("payment {id} is already {status}")]
    Conflict { id: PaymentId, status: PaymentStatus },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl SettleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SettleError::Validation(_) | SettleError::Config(_) => ErrorKind::Validation,
            SettleError::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            SettleError::Gateway(GatewayError::UnknownLabel(_)) => ErrorKind::NotFound,
            SettleError::Gateway(GatewayError::InvalidRequest(_)) => ErrorKind::Validation,
            SettleError::Identity(IdentityError::NoLinkedAccount(_)) => ErrorKind::NotFound,
            SettleError::Conflict { .. } => ErrorKind::Conflict,
            SettleError::Store(_)
            | SettleError::Gateway(_)
            | SettleError::Identity(_)
            | SettleError::Timeout { .. } => ErrorKind::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    #[test]
    fn errors_map_onto_kinds() {
        let timeout = SettleError::Timeout {
            operation: "gateway.check_status",
            limit: Duration::from_secs(5),
        };
        assert_eq!(timeout.kind(), ErrorKind::Transient);
        assert!(timeout.kind().is_retryable());

        let missing: SettleError = StoreError::NotFound(PaymentId::new("p1")).into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert!(missing.kind().is_retryable());

        let unlinked: SettleError = IdentityError::NoLinkedAccount(UserId::new("bob")).into();
        assert_eq!(unlinked.kind(), ErrorKind::NotFound);

        let invalid: SettleError = ValidationError::MissingField("sender").into();
        assert_eq!(invalid.kind(), ErrorKind::Validation);
        assert!(!invalid.kind().is_retryable());

        let conflict = SettleError::Conflict {
            id: PaymentId::new("p1"),
            status: PaymentStatus::Complete,
        };
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert_eq!(conflict.to_string(), "payment p1 is already COMPLETE");
    }
}
