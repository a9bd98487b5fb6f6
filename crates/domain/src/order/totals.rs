use common::Money;
use serde::{Deserialize, Serialize};

use super::OrderLineInput;

/// VAT rate applied to lines that do not carry their own.
pub const DEFAULT_VAT_RATE: u32 = 20;

/// `quantity × unit_price`, discounted and rounded half-up to the cent.
pub fn line_subtotal(unit_price: Money, quantity: u32, discount: u32) -> Money {
    unit_price.multiply(quantity).discounted(discount)
}

/// A line reduced to what the order totals need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub subtotal: Money,
    pub vat_rate: u32,
}

impl PricedLine {
    pub fn from_input(line: &OrderLineInput, default_vat_rate: u32) -> Self {
        Self {
            subtotal: line_subtotal(line.unit_price, line.quantity, line.discount),
            vat_rate: line.vat_rate.unwrap_or(default_vat_rate),
        }
    }

    pub fn tax(&self) -> Money {
        self.subtotal.percentage(self.vat_rate)
    }
}

/// Monetary totals stored on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_cost: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Goods totals without shipping. VAT is rounded per line.
    pub fn from_lines(lines: &[PricedLine]) -> Self {
        let subtotal = lines.iter().map(|line| line.subtotal).sum();
        let tax_amount = lines.iter().map(PricedLine::tax).sum();
        Self {
            subtotal,
            tax_amount,
            shipping_cost: Money::zero(),
            total: subtotal + tax_amount,
        }
    }

    /// Replaces the shipping cost and recomputes the total.
    pub fn with_shipping(self, shipping_cost: Money) -> Self {
        Self {
            shipping_cost,
            total: self.subtotal + self.tax_amount + shipping_cost,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use common::ProductId;

    use super::*;

    #[test]
    fn test_line_subtotal_applies_discount_half_up() {
        assert_eq!(line_subtotal(Money::from_cents(1000), 3, 0), Money::from_cents(3000));
        assert_eq!(line_subtotal(Money::from_cents(1000), 3, 10), Money::from_cents(2700));
        // 3 × 0.99 = 2.97, -15 % = 2.5245
        assert_eq!(line_subtotal(Money::from_cents(99), 3, 15), Money::from_cents(252));
        // 0.05 × 0.5 = 0.025 rounds up
        assert_eq!(line_subtotal(Money::from_cents(5), 1, 50), Money::from_cents(3));
        assert_eq!(line_subtotal(Money::from_cents(1000), 2, 100), Money::zero());
    }

    #[test]
    fn test_totals_with_mixed_vat() {
        let lines = [
            PricedLine::from_input(
                &OrderLineInput::new(ProductId::new(1), "Livre", 2, Money::from_cents(1500))
                    .with_vat_rate(5),
                DEFAULT_VAT_RATE,
            ),
            PricedLine::from_input(
                &OrderLineInput::new(ProductId::new(2), "Lampe", 1, Money::from_cents(2999)),
                DEFAULT_VAT_RATE,
            ),
        ];

        let totals = OrderTotals::from_lines(&lines).with_shipping(Money::from_cents(690));

        assert_eq!(totals.subtotal, Money::from_cents(5999));
        // 150 + 599.8 -> 150 + 600
        assert_eq!(totals.tax_amount, Money::from_cents(750));
        assert_eq!(totals.shipping_cost, Money::from_cents(690));
        assert_eq!(totals.total, Money::from_cents(7439));
    }

    #[test]
    fn test_with_shipping_replaces_previous_fee() {
        let totals = OrderTotals::from_lines(&[PricedLine {
            subtotal: Money::from_cents(1000),
            vat_rate: 20,
        }])
        .with_shipping(Money::from_cents(490))
        .with_shipping(Money::zero());

        assert_eq!(totals.total, Money::from_cents(1200));
    }
}
