//! Order line status codes, their transition table, and the order-level rollup status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A numeric status code that matches no known status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown status code: {0}")]
pub struct UnknownStatusCode(pub u16);

/// Status of a single order line.
///
/// Transitions:
/// ```text
/// PENDING ──► CONFIRMED ──► PREPARING ──► READY ──► SHIPPED ──► DELIVERED
///    │            │             │           │          │            │
///    │            │             │           │          └──► RETURNED ◄┘
///    ├────────────┴─────────────┴──► CANCELLED_STOCK        │
///    └────────────┴─────────────┴───────────┴──► CANCELLED_CLIENT
///                                                           ▼
///                                                       REFUNDED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum OrderStatusCode {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Shipped,
    Delivered,
    CancelledClient,
    CancelledStock,
    Returned,
    Refunded,
}

/// Display metadata for a line status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusInfo {
    pub code: u16,
    pub label: &'static str,
    pub color: &'static str,
    pub is_final: bool,
    pub is_active: bool,
}

impl OrderStatusCode {
    /// Every status, in code order.
    pub const ALL: [OrderStatusCode; 10] = [
        OrderStatusCode::Pending,
        OrderStatusCode::Confirmed,
        OrderStatusCode::Preparing,
        OrderStatusCode::Ready,
        OrderStatusCode::Shipped,
        OrderStatusCode::Delivered,
        OrderStatusCode::CancelledClient,
        OrderStatusCode::CancelledStock,
        OrderStatusCode::Returned,
        OrderStatusCode::Refunded,
    ];

    pub fn code(&self) -> u16 {
        match self {
            OrderStatusCode::Pending => 1,
            OrderStatusCode::Confirmed => 2,
            OrderStatusCode::Preparing => 3,
            OrderStatusCode::Ready => 4,
            OrderStatusCode::Shipped => 5,
            OrderStatusCode::Delivered => 6,
            OrderStatusCode::CancelledClient => 91,
            OrderStatusCode::CancelledStock => 92,
            OrderStatusCode::Returned => 93,
            OrderStatusCode::Refunded => 94,
        }
    }

    pub fn from_code(code: u16) -> Result<Self, UnknownStatusCode> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or(UnknownStatusCode(code))
    }

    /// Statuses reachable in one step from this one.
    pub fn allowed_transitions(&self) -> &'static [OrderStatusCode] {
        use OrderStatusCode::*;
        match self {
            Pending => &[Confirmed, CancelledClient, CancelledStock],
            Confirmed => &[Preparing, CancelledClient, CancelledStock],
            Preparing => &[Ready, CancelledClient, CancelledStock],
            Ready => &[Shipped, CancelledClient],
            Shipped => &[Delivered, Returned],
            Delivered => &[Returned],
            Returned => &[Refunded],
            CancelledClient | CancelledStock | Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatusCode) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// DELIVERED counts as final for display even though a return can still follow it.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OrderStatusCode::Delivered
                | OrderStatusCode::CancelledClient
                | OrderStatusCode::CancelledStock
                | OrderStatusCode::Refunded
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatusCode::Pending
                | OrderStatusCode::Confirmed
                | OrderStatusCode::Preparing
                | OrderStatusCode::Ready
                | OrderStatusCode::Shipped
        )
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            OrderStatusCode::CancelledClient | OrderStatusCode::CancelledStock
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusCode::Pending => "PENDING",
            OrderStatusCode::Confirmed => "CONFIRMED",
            OrderStatusCode::Preparing => "PREPARING",
            OrderStatusCode::Ready => "READY",
            OrderStatusCode::Shipped => "SHIPPED",
            OrderStatusCode::Delivered => "DELIVERED",
            OrderStatusCode::CancelledClient => "CANCELLED_CLIENT",
            OrderStatusCode::CancelledStock => "CANCELLED_STOCK",
            OrderStatusCode::Returned => "RETURNED",
            OrderStatusCode::Refunded => "REFUNDED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatusCode::Pending => "En attente",
            OrderStatusCode::Confirmed => "Confirmée",
            OrderStatusCode::Preparing => "En préparation",
            OrderStatusCode::Ready => "Prête à expédier",
            OrderStatusCode::Shipped => "Expédiée",
            OrderStatusCode::Delivered => "Livrée",
            OrderStatusCode::CancelledClient => "Annulée par le client",
            OrderStatusCode::CancelledStock => "Annulée (rupture de stock)",
            OrderStatusCode::Returned => "Retournée",
            OrderStatusCode::Refunded => "Remboursée",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            OrderStatusCode::Pending => "#f0ad4e",
            OrderStatusCode::Confirmed => "#5bc0de",
            OrderStatusCode::Preparing => "#337ab7",
            OrderStatusCode::Ready => "#6f42c1",
            OrderStatusCode::Shipped => "#17a2b8",
            OrderStatusCode::Delivered => "#5cb85c",
            OrderStatusCode::CancelledClient | OrderStatusCode::CancelledStock => "#d9534f",
            OrderStatusCode::Returned => "#fd7e14",
            OrderStatusCode::Refunded => "#6c757d",
        }
    }

    pub fn info(&self) -> StatusInfo {
        StatusInfo {
            code: self.code(),
            label: self.label(),
            color: self.color(),
            is_final: self.is_final(),
            is_active: self.is_active(),
        }
    }

    /// Order-level status an order takes when every line has converged on `self`.
    ///
    /// READY collapses into PREPARING and both cancellation codes collapse into
    /// a single cancelled status.
    pub fn order_status(&self) -> OrderStatus {
        match self {
            OrderStatusCode::Pending => OrderStatus::Pending,
            OrderStatusCode::Confirmed => OrderStatus::Confirmed,
            OrderStatusCode::Preparing | OrderStatusCode::Ready => OrderStatus::Preparing,
            OrderStatusCode::Shipped => OrderStatus::Shipped,
            OrderStatusCode::Delivered => OrderStatus::Delivered,
            OrderStatusCode::CancelledClient | OrderStatusCode::CancelledStock => {
                OrderStatus::Cancelled
            }
            OrderStatusCode::Returned => OrderStatus::Returned,
            OrderStatusCode::Refunded => OrderStatus::Refunded,
        }
    }
}

impl std::fmt::Display for OrderStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

impl TryFrom<u16> for OrderStatusCode {
    type Error = UnknownStatusCode;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<OrderStatusCode> for u16 {
    fn from(status: OrderStatusCode) -> Self {
        status.code()
    }
}

/// Top-level status of an order, written only by the line rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u16", into = "u16")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
        OrderStatus::Refunded,
    ];

    /// Codes share the numbering of the line statuses they roll up from.
    pub fn code(&self) -> u16 {
        match self {
            OrderStatus::Pending => 1,
            OrderStatus::Confirmed => 2,
            OrderStatus::Preparing => 3,
            OrderStatus::Shipped => 5,
            OrderStatus::Delivered => 6,
            OrderStatus::Cancelled => 91,
            OrderStatus::Returned => 93,
            OrderStatus::Refunded => 94,
        }
    }

    pub fn from_code(code: u16) -> Result<Self, UnknownStatusCode> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or(UnknownStatusCode(code))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Returned => "RETURNED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

impl TryFrom<u16> for OrderStatus {
    type Error = UnknownStatusCode;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<OrderStatus> for u16 {
    fn from(status: OrderStatus) -> Self {
        status.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatusCode::*;

    const EDGES: &[(OrderStatusCode, OrderStatusCode)] = &[
        (Pending, Confirmed),
        (Pending, CancelledClient),
        (Pending, CancelledStock),
        (Confirmed, Preparing),
        (Confirmed, CancelledClient),
        (Confirmed, CancelledStock),
        (Preparing, Ready),
        (Preparing, CancelledClient),
        (Preparing, CancelledStock),
        (Ready, Shipped),
        (Ready, CancelledClient),
        (Shipped, Delivered),
        (Shipped, Returned),
        (Delivered, Returned),
        (Returned, Refunded),
    ];

    #[test]
    fn test_adjacency_matches_edge_list_exactly() {
        for from in OrderStatusCode::ALL {
            for to in OrderStatusCode::ALL {
                let expected = EDGES.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {expected}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_outgoing_edges() {
        for status in [CancelledClient, CancelledStock, Refunded] {
            assert!(status.allowed_transitions().is_empty());
        }
    }

    #[test]
    fn test_codes_roundtrip() {
        for status in OrderStatusCode::ALL {
            assert_eq!(OrderStatusCode::from_code(status.code()), Ok(status));
        }
        assert_eq!(OrderStatusCode::from_code(7), Err(UnknownStatusCode(7)));
    }

    #[test]
    fn test_final_and_active_sets() {
        let finals: Vec<_> = OrderStatusCode::ALL
            .into_iter()
            .filter(|s| s.is_final())
            .collect();
        assert_eq!(finals, vec![Delivered, CancelledClient, CancelledStock, Refunded]);

        let active: Vec<_> = OrderStatusCode::ALL
            .into_iter()
            .filter(|s| s.is_active())
            .collect();
        assert_eq!(active, vec![Pending, Confirmed, Preparing, Ready, Shipped]);
    }

    #[test]
    fn test_rollup_mapping_collapses_ready_and_cancellations() {
        assert_eq!(Ready.order_status(), OrderStatus::Preparing);
        assert_eq!(Preparing.order_status(), OrderStatus::Preparing);
        assert_eq!(CancelledClient.order_status(), OrderStatus::Cancelled);
        assert_eq!(CancelledStock.order_status(), OrderStatus::Cancelled);
        assert_eq!(Shipped.order_status(), OrderStatus::Shipped);
    }

    #[test]
    fn test_display_names_code() {
        assert_eq!(Delivered.to_string(), "DELIVERED (6)");
        assert_eq!(OrderStatus::Cancelled.to_string(), "CANCELLED (91)");
    }

    #[test]
    fn test_serializes_as_numeric_code() {
        assert_eq!(serde_json::to_string(&CancelledStock).unwrap(), "92");
        let parsed: OrderStatusCode = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, Ready);
        assert!(serde_json::from_str::<OrderStatusCode>("42").is_err());
    }

    #[test]
    fn test_info() {
        let info = Pending.info();
        assert_eq!(info.code, 1);
        assert_eq!(info.label, "En attente");
        assert!(info.is_active);
        assert!(!info.is_final);
    }
}
