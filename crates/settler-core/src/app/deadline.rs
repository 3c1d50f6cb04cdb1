//! Bounded-deadline wrapper for port calls.

use std::future::Future;
use std::time::Duration;

use crate::error::SettleError;

/// Await `fut` for at most `limit`.
///
/// An elapsed deadline becomes `SettleError::Timeout`; the port's own error
/// is converted into `SettleError`. The future is dropped on timeout, so an
/// adapter that has not reached its write yet writes nothing.
pub async fn with_deadline<T, E, F>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, SettleError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<SettleError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_elapsed) => Err(SettleError::Timeout { operation, limit }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, PaymentId};
    use crate::ports::StoreError;

    #[tokio::test]
    async fn passes_results_through() {
        let ok: Result<u32, SettleError> =
            with_deadline(Duration::from_secs(1), "noop", async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = with_deadline(Duration::from_secs(1), "store.get", async {
            Err::<(), _>(StoreError::NotFound(PaymentId::new("p1")))
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_transient() {
        let err = with_deadline(Duration::from_millis(50), "gateway.check_status", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, StoreError>(())
        })
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            SettleError::Timeout { operation: "gateway.check_status", .. }
        ));
        assert_eq!(err.kind(), ErrorKind::Transient);
    }
}
