//! Available-to-sell stock and temporary reservations.

use std::sync::Arc;

use chrono::Utc;
use common::{OrderId, ProductId, SessionId};
use domain::stock::{available_stock, is_low_stock};
use domain::{AvailabilityCheck, Reservation, StockAlert, ValidationError};
use store::{KeyValueStore, ProductStockRepository};
use tracing::{info, warn};

use crate::config::{FulfillmentConfig, ReservationMode};
use crate::error::Result;
use crate::ledger::ReservationLedger;

/// Answers stock questions and manages reservations against a product
/// stock repository and a [`ReservationLedger`].
///
/// Reads degrade to "no stock" on failure; writes propagate their errors,
/// except release, which never fails.
#[derive(Clone)]
pub struct StockAvailabilityService<R, K>
where
    R: ProductStockRepository,
    K: KeyValueStore,
{
    products: R,
    ledger: ReservationLedger<K>,
    config: Arc<FulfillmentConfig>,
}

impl<R, K> StockAvailabilityService<R, K>
where
    R: ProductStockRepository,
    K: KeyValueStore,
{
    pub fn new(products: R, kv: K, config: Arc<FulfillmentConfig>) -> Self {
        Self {
            products,
            ledger: ReservationLedger::new(kv, config.clone()),
            config,
        }
    }

    pub fn ledger(&self) -> &ReservationLedger<K> {
        &self.ledger
    }

    /// `max(0, physical − committed − held)`. Any read failure yields 0.
    #[tracing::instrument(skip(self))]
    pub async fn get_available_stock(&self, product_id: ProductId) -> i64 {
        let record = match self.products.get_stock(product_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return 0,
            Err(e) => {
                warn!(%product_id, error = %e, "stock read failed, reporting no stock");
                return 0;
            }
        };

        let held = match self.ledger.held_total(product_id).await {
            Ok(held) => held,
            Err(e) => {
                warn!(
                    %product_id,
                    error = %e,
                    "reservation total read failed, reporting no stock"
                );
                return 0;
            }
        };

        available_stock(record.physical_stock, record.committed_stock, held)
    }

    #[tracing::instrument(skip(self))]
    pub async fn check_availability(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> AvailabilityCheck {
        let stock = self.get_available_stock(product_id).await;
        AvailabilityCheck::evaluate(quantity, stock)
    }

    /// Holds `quantity` units for a session.
    ///
    /// Returns false, writing nothing, when stock is short. A session that
    /// already holds this product has its hold resized instead.
    #[tracing::instrument(skip(self))]
    pub async fn reserve_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
        session_id: &SessionId,
    ) -> Result<bool> {
        self.update_reservation(product_id, session_id, quantity).await
    }

    /// Replaces the held quantity.
    ///
    /// Growing a hold re-checks availability for the difference only;
    /// shrinking always succeeds. Without a prior hold this reserves afresh.
    #[tracing::instrument(skip(self))]
    pub async fn update_reservation(
        &self,
        product_id: ProductId,
        session_id: &SessionId,
        quantity: u32,
    ) -> Result<bool> {
        ensure_positive(quantity)?;

        let updated = match self.existing_reservation(product_id, session_id).await {
            Some(existing) => self.resize(existing, quantity).await?,
            None => self.create(product_id, session_id, quantity).await?,
        };

        record_outcome(updated);
        Ok(updated)
    }

    /// Drops a session's hold. Missing holds and store failures are ignored.
    #[tracing::instrument(skip(self))]
    pub async fn release_stock(&self, product_id: ProductId, session_id: &SessionId) {
        let reservation = match self.ledger.get(product_id, session_id).await {
            Ok(Some(reservation)) => reservation,
            Ok(None) => return,
            Err(e) => {
                warn!(
                    %product_id,
                    %session_id,
                    error = %e,
                    "reservation read failed, release skipped"
                );
                return;
            }
        };

        if let Err(e) = self
            .ledger
            .adjust_total(product_id, -i64::from(reservation.quantity))
            .await
        {
            warn!(%product_id, %session_id, error = %e, "failed to decrement reservation total");
        }
        if let Err(e) = self.ledger.remove(product_id, session_id).await {
            warn!(%product_id, %session_id, error = %e, "failed to delete reservation");
        }

        metrics::counter!("stock_reservations_released_total").increment(1);
        info!(%product_id, %session_id, quantity = reservation.quantity, "reservation released");
    }

    /// Turns a hold into committed stock at checkout.
    ///
    /// Returns false when there is no hold or the commit fails; the hold is
    /// then left in place for a retry or for its TTL to run out.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_reservation(
        &self,
        product_id: ProductId,
        session_id: &SessionId,
        order_id: OrderId,
    ) -> bool {
        let Some(reservation) = self.existing_reservation(product_id, session_id).await else {
            metrics::counter!("stock_reservations_confirmed_total", "outcome" => "missing")
                .increment(1);
            return false;
        };

        match self
            .products
            .increment_committed_stock(product_id, reservation.quantity)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(%product_id, %order_id, "cannot commit stock for unknown product");
                metrics::counter!("stock_reservations_confirmed_total", "outcome" => "failed")
                    .increment(1);
                return false;
            }
            Err(e) => {
                warn!(%product_id, %order_id, error = %e, "failed to commit reserved stock");
                metrics::counter!("stock_reservations_confirmed_total", "outcome" => "failed")
                    .increment(1);
                return false;
            }
        }

        self.release_stock(product_id, session_id).await;

        metrics::counter!("stock_reservations_confirmed_total", "outcome" => "confirmed")
            .increment(1);
        info!(%product_id, %order_id, quantity = reservation.quantity, "reservation confirmed");
        true
    }

    /// `0 < available <= threshold`.
    pub async fn is_low_stock(&self, product_id: ProductId) -> bool {
        let stock = self.get_available_stock(product_id).await;
        is_low_stock(stock, self.config.low_stock_threshold)
    }

    pub async fn get_stock_alert(&self, product_id: ProductId) -> StockAlert {
        let stock = self.get_available_stock(product_id).await;
        StockAlert::for_stock(stock, self.config.low_stock_threshold)
    }

    async fn existing_reservation(
        &self,
        product_id: ProductId,
        session_id: &SessionId,
    ) -> Option<Reservation> {
        match self.ledger.get(product_id, session_id).await {
            Ok(reservation) => reservation,
            Err(e) => {
                warn!(
                    %product_id,
                    %session_id,
                    error = %e,
                    "reservation read failed, treating as none"
                );
                None
            }
        }
    }

    async fn create(
        &self,
        product_id: ProductId,
        session_id: &SessionId,
        quantity: u32,
    ) -> Result<bool> {
        if !self.hold(product_id, quantity).await? {
            return Ok(false);
        }

        let reservation = Reservation::new(
            product_id,
            session_id.clone(),
            quantity,
            Utc::now(),
            self.config.reservation_ttl,
        );
        self.write_reservation(&reservation, i64::from(quantity))
            .await?;

        info!(%product_id, %session_id, quantity, "stock reserved");
        Ok(true)
    }

    async fn resize(&self, existing: Reservation, quantity: u32) -> Result<bool> {
        let product_id = existing.product_id;
        let diff = i64::from(quantity) - i64::from(existing.quantity);

        if diff > 0 && !self.hold(product_id, quantity - existing.quantity).await? {
            return Ok(false);
        }

        let resized = existing.resized(quantity, Utc::now(), self.config.reservation_ttl);
        self.write_reservation(&resized, diff).await?;

        info!(
            %product_id,
            session_id = %existing.session_id,
            from = existing.quantity,
            to = quantity,
            "reservation updated"
        );
        Ok(true)
    }

    /// Decides whether `quantity` more units may be held.
    ///
    /// In atomic mode this also grows the running total.
    async fn hold(&self, product_id: ProductId, quantity: u32) -> Result<bool> {
        match self.ledger.mode() {
            ReservationMode::BestEffort => {
                let stock = self.get_available_stock(product_id).await;
                Ok(AvailabilityCheck::evaluate(quantity, stock).available)
            }
            ReservationMode::Atomic => {
                let Some(ceiling) = self.hold_ceiling(product_id).await else {
                    return Ok(false);
                };
                let held = self
                    .ledger
                    .try_hold(product_id, i64::from(quantity), ceiling)
                    .await?;
                Ok(held.is_some())
            }
        }
    }

    /// Most units that may be held at once: `physical − committed`.
    async fn hold_ceiling(&self, product_id: ProductId) -> Option<i64> {
        match self.products.get_stock(product_id).await {
            Ok(Some(record)) => Some(record.physical_stock - record.committed_stock),
            Ok(None) => None,
            Err(e) => {
                warn!(%product_id, error = %e, "stock read failed, refusing reservation");
                None
            }
        }
    }

    /// Persists the reservation and applies `delta` to the running total.
    ///
    /// In atomic mode the total was already grown by [`Self::hold`] for
    /// positive deltas; a failed reservation write gives those units back.
    async fn write_reservation(&self, reservation: &Reservation, delta: i64) -> Result<()> {
        let product_id = reservation.product_id;
        match self.ledger.mode() {
            ReservationMode::BestEffort => {
                self.ledger.put(reservation).await?;
                if delta != 0 {
                    self.ledger.adjust_total(product_id, delta).await?;
                }
            }
            ReservationMode::Atomic => {
                if let Err(e) = self.ledger.put(reservation).await {
                    if delta > 0
                        && let Err(undo) = self.ledger.adjust_total(product_id, -delta).await
                    {
                        warn!(%product_id, error = %undo, "failed to give back held units");
                    }
                    return Err(e.into());
                }
                if delta < 0 {
                    self.ledger.adjust_total(product_id, delta).await?;
                }
            }
        }
        Ok(())
    }
}

fn ensure_positive(quantity: u32) -> std::result::Result<(), ValidationError> {
    if quantity == 0 {
        return Err(ValidationError::NonPositiveQuantity { quantity: 0 });
    }
    Ok(())
}

fn record_outcome(success: bool) {
    let outcome = if success { "reserved" } else { "insufficient" };
    metrics::counter!("stock_reservations_total", "outcome" => outcome).increment(1);
}
