//! Order commands.

use common::{
    Address, CustomerId, LineId, Money, OrderId, OrderStatusCode, ProductId, SessionId, UserId,
};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// One line of a new order, as submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    /// VAT rate in percent; the configured default applies when absent.
    #[serde(default)]
    pub vat_rate: Option<u32>,
    /// Discount in percent.
    #[serde(default)]
    pub discount: u32,
}

impl OrderLineInput {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            vat_rate: None,
            discount: 0,
        }
    }

    pub fn with_vat_rate(mut self, rate: u32) -> Self {
        self.vat_rate = Some(rate);
        self
    }

    pub fn with_discount(mut self, discount: u32) -> Self {
        self.discount = discount;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.product_name.trim().is_empty() {
            return Err(ValidationError::MissingField("product_name"));
        }
        if self.quantity == 0 {
            return Err(ValidationError::NonPositiveQuantity { quantity: 0 });
        }
        if self.unit_price.is_negative() {
            return Err(ValidationError::NegativeUnitPrice {
                price: self.unit_price,
            });
        }
        if self.discount > 100 {
            return Err(ValidationError::InvalidDiscount {
                discount: self.discount,
            });
        }
        if let Some(rate) = self.vat_rate
            && rate > 100
        {
            return Err(ValidationError::InvalidVatRate { rate });
        }
        Ok(())
    }
}

/// Command to create an order at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub customer_id: CustomerId,
    pub lines: Vec<OrderLineInput>,
    pub billing_address: Address,
    pub shipping_address: Address,
    #[serde(default)]
    pub note: Option<String>,
    /// Cart session whose reservations are confirmed once the order exists.
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

impl CreateOrder {
    pub fn new(
        customer_id: CustomerId,
        billing_address: Address,
        shipping_address: Address,
    ) -> Self {
        Self {
            customer_id,
            lines: Vec::new(),
            billing_address,
            shipping_address,
            note: None,
            session_id: None,
        }
    }

    pub fn line(mut self, line: OrderLineInput) -> Self {
        self.lines.push(line);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lines.is_empty() {
            return Err(ValidationError::NoLines);
        }
        if self.shipping_address.country.trim().is_empty() {
            return Err(ValidationError::MissingField("shipping_address.country"));
        }
        self.lines.iter().try_for_each(OrderLineInput::validate)
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.quantity))
    }
}

/// Command to cancel every line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    #[serde(default)]
    pub reason: Option<String>,
    /// Cancel as out-of-stock rather than at the client's request.
    #[serde(default)]
    pub out_of_stock: bool,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl CancelOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            ..Default::default()
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn out_of_stock(mut self) -> Self {
        self.out_of_stock = true;
        self
    }

    pub fn by(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn target_status(&self) -> OrderStatusCode {
        if self.out_of_stock {
            OrderStatusCode::CancelledStock
        } else {
            OrderStatusCode::CancelledClient
        }
    }
}

/// Command to move one line to a new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLineStatus {
    pub line_id: LineId,
    pub status: OrderStatusCode,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl UpdateLineStatus {
    pub fn new(line_id: LineId, status: OrderStatusCode) -> Self {
        Self {
            line_id,
            status,
            comment: None,
            user_id: None,
        }
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn by(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address::new("Jeanne Martin", "1 rue de Rivoli", "75001", "Paris", "FR")
    }

    fn line(quantity: u32) -> OrderLineInput {
        OrderLineInput::new(ProductId::new(1), "Tasse", quantity, Money::from_cents(1200))
    }

    #[test]
    fn test_create_order_requires_lines() {
        let cmd = CreateOrder::new(CustomerId::new(), address(), address());
        assert_eq!(cmd.validate(), Err(ValidationError::NoLines));
        assert!(cmd.line(line(1)).validate().is_ok());
    }

    #[test]
    fn test_line_validation() {
        assert_eq!(
            line(0).validate(),
            Err(ValidationError::NonPositiveQuantity { quantity: 0 })
        );
        assert_eq!(
            line(1).with_discount(120).validate(),
            Err(ValidationError::InvalidDiscount { discount: 120 })
        );
        assert_eq!(
            line(1).with_vat_rate(250).validate(),
            Err(ValidationError::InvalidVatRate { rate: 250 })
        );

        let mut unnamed = line(1);
        unnamed.product_name = "  ".to_string();
        assert_eq!(
            unnamed.validate(),
            Err(ValidationError::MissingField("product_name"))
        );

        let mut negative = line(1);
        negative.unit_price = Money::from_cents(-1);
        assert!(matches!(
            negative.validate(),
            Err(ValidationError::NegativeUnitPrice { .. })
        ));
    }

    #[test]
    fn test_total_quantity() {
        let cmd = CreateOrder::new(CustomerId::new(), address(), address())
            .line(line(2))
            .line(line(3));
        assert_eq!(cmd.total_quantity(), 5);
    }

    #[test]
    fn test_cancel_target_status() {
        let order_id = OrderId::new();
        assert_eq!(
            CancelOrder::new(order_id).target_status(),
            OrderStatusCode::CancelledClient
        );
        assert_eq!(
            CancelOrder::new(order_id).out_of_stock().target_status(),
            OrderStatusCode::CancelledStock
        );
    }

    #[test]
    fn test_create_order_deserializes_with_defaults() {
        let json = serde_json::json!({
            "customer_id": CustomerId::new(),
            "lines": [{
                "product_id": 42,
                "product_name": "Théière",
                "quantity": 1,
                "unit_price": 3500
            }],
            "billing_address": address(),
            "shipping_address": address()
        });
        let cmd: CreateOrder = serde_json::from_value(json).unwrap();
        assert_eq!(cmd.lines[0].discount, 0);
        assert_eq!(cmd.lines[0].vat_rate, None);
        assert!(cmd.session_id.is_none());
    }
}
