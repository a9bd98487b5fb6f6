//! Temporary stock holds and their cache key layout.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use common::{ProductId, SessionId};
use serde::{Deserialize, Serialize};

/// How long a hold survives without being touched.
pub const DEFAULT_RESERVATION_TTL: Duration = Duration::from_secs(30 * 60);

/// Safety expiry of the per-product running total.
pub const DEFAULT_RESERVATION_TOTAL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache key of the hold a session keeps on a product.
pub fn reservation_key(product_id: ProductId, session_id: &SessionId) -> String {
    format!("stock:reservation:{}:{}", product_id, session_id)
}

/// Cache key of a product's running total of held units.
pub fn reserved_total_key(product_id: ProductId) -> String {
    format!("stock:reserved_total:{}", product_id)
}

/// A temporary hold on `quantity` units of a product for one session.
///
/// There is at most one per (product, session) pair; writing a new one
/// replaces the previous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub product_id: ProductId,
    pub session_id: SessionId,
    pub quantity: u32,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        product_id: ProductId,
        session_id: SessionId,
        quantity: u32,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            product_id,
            session_id,
            quantity,
            reserved_at: now,
            expires_at: now + ttl_delta(ttl),
            updated_at: now,
        }
    }

    /// Replaces the quantity and restarts the expiry clock, keeping the original
    /// reservation time.
    pub fn resized(&self, quantity: u32, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            quantity,
            expires_at: now + ttl_delta(ttl),
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn key(&self) -> String {
        reservation_key(self.product_id, &self.session_id)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

fn ttl_delta(ttl: Duration) -> TimeDelta {
    TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
}
