//! Reservation records and per-product running totals in the TTL cache.

use std::sync::Arc;

use common::{ProductId, SessionId};
use domain::{Reservation, reservation_key, reserved_total_key};
use serde_json::Value;
use store::{KeyValueStore, KeyValueStoreExt, Result};

use crate::config::{FulfillmentConfig, ReservationMode};

/// Holds temporary reservations keyed by (product, session), plus the running
/// total of held units per product.
///
/// The total is maintained by explicit adjustments paired with every
/// reservation write, never recomputed. Reservations expire passively, so a
/// total can drift above the sum of live holds until its own TTL runs out.
#[derive(Clone)]
pub struct ReservationLedger<K: KeyValueStore> {
    kv: K,
    config: Arc<FulfillmentConfig>,
}

impl<K: KeyValueStore> ReservationLedger<K> {
    pub fn new(kv: K, config: Arc<FulfillmentConfig>) -> Self {
        Self { kv, config }
    }

    pub async fn get(
        &self,
        product_id: ProductId,
        session_id: &SessionId,
    ) -> Result<Option<Reservation>> {
        self.kv
            .get_json(&reservation_key(product_id, session_id))
            .await
    }

    /// Writes (or replaces) a reservation with a fresh TTL.
    pub async fn put(&self, reservation: &Reservation) -> Result<()> {
        self.kv
            .set_json(&reservation.key(), reservation, self.config.reservation_ttl)
            .await
    }

    pub async fn remove(&self, product_id: ProductId, session_id: &SessionId) -> Result<bool> {
        self.kv
            .delete(&reservation_key(product_id, session_id))
            .await
    }

    /// Units currently held for a product. Absent counts as 0.
    pub async fn held_total(&self, product_id: ProductId) -> Result<i64> {
        self.kv.get_counter(&reserved_total_key(product_id)).await
    }

    /// Adds `delta` (possibly negative) to the running total.
    ///
    /// Best-effort mode does an unguarded read-modify-write; atomic mode uses
    /// the store's increment.
    pub async fn adjust_total(&self, product_id: ProductId, delta: i64) -> Result<i64> {
        let key = reserved_total_key(product_id);
        let ttl = self.config.reservation_total_ttl;
        match self.config.reservation_mode {
            ReservationMode::BestEffort => {
                let next = self.kv.get_counter(&key).await? + delta;
                self.kv.set_with_ttl(&key, Value::from(next), ttl).await?;
                Ok(next)
            }
            ReservationMode::Atomic => self.kv.increment(&key, delta, ttl).await,
        }
    }

    /// Atomically grows the running total by `delta` unless it would pass
    /// `ceiling`. Returns `None` when refused.
    pub async fn try_hold(
        &self,
        product_id: ProductId,
        delta: i64,
        ceiling: i64,
    ) -> Result<Option<i64>> {
        self.kv
            .increment_within(
                &reserved_total_key(product_id),
                delta,
                ceiling,
                self.config.reservation_total_ttl,
            )
            .await
    }

    pub fn mode(&self) -> ReservationMode {
        self.config.reservation_mode
    }

    pub fn config(&self) -> &FulfillmentConfig {
        &self.config
    }
}
