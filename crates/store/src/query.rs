use common::{LineId, OrderId, OrderStatusCode, ProductId};

/// Filter for order line lookups.
///
/// Every field is optional; set fields are combined with AND.
#[derive(Debug, Clone, Default)]
pub struct LineFilter {
    /// Lines belonging to this order.
    pub order_id: Option<OrderId>,

    /// Lines for this product.
    pub product_id: Option<ProductId>,

    /// Lines currently in this status.
    pub status: Option<OrderStatusCode>,
}

impl LineFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter for every line of an order.
    pub fn for_order(order_id: OrderId) -> Self {
        Self {
            order_id: Some(order_id),
            ..Default::default()
        }
    }

    pub fn product_id(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn status(mut self, status: OrderStatusCode) -> Self {
        self.status = Some(status);
        self
    }
}

/// Query over the status history. Results are always most-recent-first.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    /// Entries of this order (order-level and line-level).
    pub order_id: Option<OrderId>,

    /// Entries of this line only.
    pub line_id: Option<LineId>,

    /// Restrict to order-level entries.
    pub order_level_only: bool,

    /// Maximum number of entries to return.
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for the full history of an order.
    pub fn for_order(order_id: OrderId) -> Self {
        Self {
            order_id: Some(order_id),
            ..Default::default()
        }
    }

    /// Creates a query for the history of a single line.
    pub fn for_line(line_id: LineId) -> Self {
        Self {
            line_id: Some(line_id),
            ..Default::default()
        }
    }

    pub fn order_level_only(mut self) -> Self {
        self.order_level_only = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
