//! Available-to-sell arithmetic and stock alert levels.

use serde::{Deserialize, Serialize};

/// Availability at or below this many units counts as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Units that can still be sold.
///
/// Floors at zero. A negative running total of holds (drift from expired
/// reservations) is treated as no holds at all.
pub fn available_stock(physical: i64, committed: i64, held: i64) -> i64 {
    physical
        .saturating_sub(committed)
        .saturating_sub(held.max(0))
        .max(0)
}

/// `0 < stock <= threshold`.
pub fn is_low_stock(stock: i64, threshold: i64) -> bool {
    stock > 0 && stock <= threshold
}

/// Answer to "can I have `requested` units?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityCheck {
    pub available: bool,
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AvailabilityCheck {
    pub fn evaluate(requested: u32, stock: i64) -> Self {
        if i64::from(requested) <= stock {
            Self {
                available: true,
                stock,
                message: None,
            }
        } else {
            Self {
                available: false,
                stock,
                message: Some(format!(
                    "Stock insuffisant : {stock} disponible(s), {requested} demandé(s)"
                )),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockAlertLevel {
    Ok,
    Low,
    Out,
}

/// Customer-facing stock badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub level: StockAlertLevel,
    pub stock: i64,
    pub message: String,
}

impl StockAlert {
    pub fn for_stock(stock: i64, threshold: i64) -> Self {
        let stock = stock.max(0);
        let (level, message) = if stock == 0 {
            (StockAlertLevel::Out, "Rupture de stock".to_string())
        } else if stock <= threshold {
            (StockAlertLevel::Low, format!("Plus que {stock} en stock"))
        } else {
            (StockAlertLevel::Ok, "En stock".to_string())
        };
        Self {
            level,
            stock,
            message,
        }
    }
}
