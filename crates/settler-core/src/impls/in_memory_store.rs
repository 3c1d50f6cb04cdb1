//! InMemoryPaymentStore - 開発用・テスト用の PaymentStore
//!
//! # 実装詳細
//! - tokio::sync::Mutex で HashMap を守る（1 操作 = 1 ロック）
//! - advance_status は同じロックの中で read → check → write するので atomic
//! - insertion order is kept so history and restore are deterministic

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{NewPayment, Payment, PaymentId, PaymentStatus, UserId};
use crate::ports::{
    Clock, IdGenerator, PaymentStore, StatusUpdate, StoreError, SystemClock, UlidGenerator,
};

#[derive(Default)]
struct StoreState {
    payments: HashMap<PaymentId, Payment>,
    /// Ids in insertion order.
    order: Vec<PaymentId>,
}

impl StoreState {
    fn get_mut(&mut self, id: &PaymentId) -> Result<&mut Payment, StoreError> {
        self.payments
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn in_order(&self) -> impl Iterator<Item = &Payment> + '_ {
        self.order.iter().filter_map(|id| self.payments.get(id))
    }
}

pub struct InMemoryPaymentStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let ids = Arc::new(UlidGenerator::new(SharedClock(clock.clone())));
        Self::with_parts(clock, ids)
    }

    pub fn with_parts(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
            ids,
        }
    }

    /// Insert or replace a payment as-is (fixtures, imports).
    pub async fn put(&self, payment: Payment) {
        let mut state = self.state.lock().await;
        if !state.payments.contains_key(&payment.id) {
            state.order.push(payment.id.clone());
        }
        state.payments.insert(payment.id.clone(), payment);
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.payments.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryPaymentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Lets the id generator share the store's clock.
struct SharedClock(Arc<dyn Clock>);

impl Clock for SharedClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.0.now()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, request: NewPayment) -> Result<PaymentId, StoreError> {
        let id = self.ids.generate_payment_id();
        let payment = Payment::new(id.clone(), request, self.clock.now());
        self.put(payment).await;
        Ok(id)
    }

    async fn get(&self, id: &PaymentId) -> Result<Payment, StoreError> {
        let state = self.state.lock().await;
        state
            .payments
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn get_status(&self, id: &PaymentId) -> Result<PaymentStatus, StoreError> {
        let state = self.state.lock().await;
        state
            .payments
            .get(id)
            .map(|p| p.status)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn set_status(&self, id: &PaymentId, status: PaymentStatus) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let payment = state.get_mut(id)?;
        payment.status = status;
        payment.updated_at = now;
        Ok(())
    }

    async fn advance_status(
        &self,
        id: &PaymentId,
        status: PaymentStatus,
    ) -> Result<StatusUpdate, StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let payment = state.get_mut(id)?;

        let current = payment.status;
        if current.is_terminal() || current == status {
            return Ok(StatusUpdate::Unchanged { current });
        }
        if !current.can_transition_to(status) {
            return Ok(StatusUpdate::Rejected { current });
        }
        payment.status = status;
        payment.updated_at = now;
        Ok(StatusUpdate::Applied { previous: current })
    }

    async fn history(
        &self,
        user: &UserId,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Payment>, StoreError> {
        let state = self.state.lock().await;
        let skip = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
        let mut sent: Vec<&Payment> = state
            .in_order()
            .filter(|p| &p.from_user_id == user)
            .collect();
        // newest first; the sort is stable so equal timestamps keep reverse insertion order
        sent.reverse();
        sent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sent
            .into_iter()
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn active_for_user(&self, user: &UserId) -> Result<Vec<Payment>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .in_order()
            .filter(|p| p.involves(user) && !p.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn list_unsettled(&self) -> Result<Vec<Payment>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .in_order()
            .filter(|p| !p.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn request(from: &str, to: &str) -> NewPayment {
        NewPayment::new(from, to, dec!(100.00), "RUB")
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = InMemoryPaymentStore::new();
        let id = store.insert(request("alice", "bob")).await.unwrap();

        let payment = store.get(&id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, dec!(100.00));
        assert_eq!(store.get_status(&id).await.unwrap(), PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = InMemoryPaymentStore::new();
        let id = PaymentId::new("missing");
        assert_eq!(store.get(&id).await, Err(StoreError::NotFound(id.clone())));
        assert_eq!(
            store.set_status(&id, PaymentStatus::Success).await,
            Err(StoreError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn advance_refuses_terminal_payments() {
        let store = InMemoryPaymentStore::new();
        let id = store.insert(request("alice", "bob")).await.unwrap();

        let update = store.advance_status(&id, PaymentStatus::Success).await.unwrap();
        assert_eq!(update, StatusUpdate::Applied { previous: PaymentStatus::Pending });

        store.advance_status(&id, PaymentStatus::Complete).await.unwrap();
        let update = store.advance_status(&id, PaymentStatus::Success).await.unwrap();
        assert_eq!(update, StatusUpdate::Unchanged { current: PaymentStatus::Complete });
        assert_eq!(store.get_status(&id).await.unwrap(), PaymentStatus::Complete);
    }

    #[tokio::test]
    async fn advance_with_same_status_is_a_noop() {
        let store = InMemoryPaymentStore::new();
        let id = store.insert(request("alice", "bob")).await.unwrap();
        let update = store.advance_status(&id, PaymentStatus::Pending).await.unwrap();
        assert_eq!(update, StatusUpdate::Unchanged { current: PaymentStatus::Pending });
        assert!(!update.is_applied());
    }

    #[rstest]
    #[case(PaymentStatus::Success, PaymentStatus::Pending)]
    #[case(PaymentStatus::Success, PaymentStatus::Failed)]
    #[case(PaymentStatus::Failed, PaymentStatus::Success)]
    #[case(PaymentStatus::Pending, PaymentStatus::Complete)]
    #[tokio::test]
    async fn advance_rejects_moves_outside_the_lifecycle(
        #[case] from: PaymentStatus,
        #[case] to: PaymentStatus,
    ) {
        let store = InMemoryPaymentStore::new();
        let id = store.insert(request("alice", "bob")).await.unwrap();
        store.set_status(&id, from).await.unwrap();

        let update = store.advance_status(&id, to).await.unwrap();
        assert_eq!(update, StatusUpdate::Rejected { current: from });
        assert_eq!(store.get_status(&id).await.unwrap(), from);
    }

    #[tokio::test]
    async fn set_status_can_revert_complete() {
        let store = InMemoryPaymentStore::new();
        let id = store.insert(request("alice", "bob")).await.unwrap();
        store.set_status(&id, PaymentStatus::Complete).await.unwrap();
        store.set_status(&id, PaymentStatus::Success).await.unwrap();
        assert_eq!(store.get_status(&id).await.unwrap(), PaymentStatus::Success);
    }

    #[tokio::test]
    async fn history_pages_newest_first() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()));
        let store = InMemoryPaymentStore::with_clock(clock);
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(store.insert(request("alice", "bob")).await.unwrap());
        }
        store.insert(request("bob", "alice")).await.unwrap();

        let alice = UserId::new("alice");
        let first = store.history(&alice, 1, 2).await.unwrap();
        let second = store.history(&alice, 2, 2).await.unwrap();
        let third = store.history(&alice, 3, 2).await.unwrap();

        assert_eq!(first.iter().map(|p| p.id.clone()).collect::<Vec<_>>(), vec![ids[4].clone(), ids[3].clone()]);
        assert_eq!(second.iter().map(|p| p.id.clone()).collect::<Vec<_>>(), vec![ids[2].clone(), ids[1].clone()]);
        assert_eq!(third.len(), 1);
    }

    #[tokio::test]
    async fn unsettled_and_active_skip_terminal_payments() {
        let store = InMemoryPaymentStore::new();
        let a = store.insert(request("alice", "bob")).await.unwrap();
        let b = store.insert(request("carol", "alice")).await.unwrap();
        let c = store.insert(request("dave", "erin")).await.unwrap();
        store.set_status(&b, PaymentStatus::Complete).await.unwrap();

        let unsettled: Vec<_> = store.list_unsettled().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(unsettled, vec![a.clone(), c]);

        let active: Vec<_> = store
            .active_for_user(&UserId::new("alice"))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(active, vec![a]);
    }
}
