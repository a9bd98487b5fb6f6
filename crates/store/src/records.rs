//! Row types for the relational store, one per persisted entity.

use chrono::{DateTime, Utc};
use common::{
    Address, CustomerId, LineId, Money, OrderId, OrderStatus, OrderStatusCode, ProductId, UserId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authoritative stock counters for one product.
///
/// Counters are signed: external stock adjustments can leave them drifted
/// below zero and readers are expected to cope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStockRecord {
    pub product_id: ProductId,
    /// Units physically on hand.
    pub physical_stock: i64,
    /// Units already allocated to confirmed orders.
    pub committed_stock: i64,
}

impl ProductStockRecord {
    pub fn new(product_id: ProductId, physical_stock: i64, committed_stock: i64) -> Self {
        Self {
            product_id,
            physical_stock,
            committed_stock,
        }
    }
}

/// An order header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub billing_address: Address,
    pub shipping_address: Address,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single order line row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRecord {
    pub id: LineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    /// VAT rate in percent.
    pub vat_rate: u32,
    /// Discount in percent (0-100).
    pub discount: u32,
    /// `quantity × unit_price` after discount.
    pub subtotal: Money,
    pub status: OrderStatusCode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable entry of the status history.
///
/// Order-level entries carry no `line_id`; their codes are [`OrderStatus`] codes.
/// Line-level entries carry the line id; their codes are [`OrderStatusCode`] codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub order_id: OrderId,
    pub line_id: Option<LineId>,
    pub previous_status: Option<u16>,
    pub new_status: u16,
    pub comment: Option<String>,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    /// Records a line status change.
    pub fn for_line(
        order_id: OrderId,
        line_id: LineId,
        previous: Option<OrderStatusCode>,
        new: OrderStatusCode,
        comment: Option<String>,
        user_id: Option<UserId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            line_id: Some(line_id),
            previous_status: previous.map(|s| s.code()),
            new_status: new.code(),
            comment,
            user_id,
            created_at: Utc::now(),
        }
    }

    /// Records an order-level status change.
    pub fn for_order(
        order_id: OrderId,
        previous: Option<OrderStatus>,
        new: OrderStatus,
        comment: Option<String>,
        user_id: Option<UserId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            line_id: None,
            previous_status: previous.map(|s| s.code()),
            new_status: new.code(),
            comment,
            user_id,
            created_at: Utc::now(),
        }
    }

    pub fn is_order_level(&self) -> bool {
        self.line_id.is_none()
    }
}
