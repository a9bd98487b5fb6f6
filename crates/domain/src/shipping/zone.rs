use serde::{Deserialize, Serialize};

/// Shipping destination zone.
///
/// `Free` is not a destination: it is the zone reported when the
/// free-shipping threshold bypasses zone pricing altogether.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingZone {
    FrMetro,
    FrCorsica,
    FrDom,
    Eu,
    World,
    Free,
}

impl ShippingZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingZone::FrMetro => "FR_METRO",
            ShippingZone::FrCorsica => "FR_CORSICA",
            ShippingZone::FrDom => "FR_DOM",
            ShippingZone::Eu => "EU",
            ShippingZone::World => "WORLD",
            ShippingZone::Free => "FREE",
        }
    }
}

impl std::fmt::Display for ShippingZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parcel weight in whole grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weight(u64);

impl Weight {
    pub const fn from_grams(grams: u64) -> Self {
        Self(grams)
    }

    pub const fn from_kilograms(kilograms: u64) -> Self {
        Self(kilograms * 1000)
    }

    /// Converts a decimal kilogram figure, rounding to the nearest gram.
    ///
    /// Negative and non-finite inputs become zero.
    pub fn from_kg_f64(kilograms: f64) -> Self {
        if !kilograms.is_finite() || kilograms <= 0.0 {
            return Self(0);
        }
        Self((kilograms * 1000.0).round() as u64)
    }

    pub fn grams(&self) -> u64 {
        self.0
    }

    pub fn kilograms(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Weight of `quantity` identical units.
    pub fn times(&self, quantity: u32) -> Weight {
        Weight(self.0.saturating_mul(u64::from(quantity)))
    }
}

impl std::ops::Add for Weight {
    type Output = Weight;

    fn add(self, other: Weight) -> Weight {
        Weight(self.0.saturating_add(other.0))
    }
}

impl std::iter::Sum for Weight {
    fn sum<I: Iterator<Item = Weight>>(iter: I) -> Weight {
        iter.fold(Weight::default(), |acc, w| acc + w)
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:03} kg", self.0 / 1000, self.0 % 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_serializes_screaming_snake_case() {
        assert_eq!(serde_json::to_string(&ShippingZone::FrCorsica).unwrap(), "\"FR_CORSICA\"");
        assert_eq!(serde_json::to_string(&ShippingZone::Free).unwrap(), "\"FREE\"");
        let parsed: ShippingZone = serde_json::from_str("\"FR_DOM\"").unwrap();
        assert_eq!(parsed, ShippingZone::FrDom);
    }

    #[test]
    fn test_weight_conversions() {
        assert_eq!(Weight::from_kg_f64(2.5).grams(), 2_500);
        assert_eq!(Weight::from_kg_f64(-1.0), Weight::from_grams(0));
        assert_eq!(Weight::from_kg_f64(f64::NAN), Weight::from_grams(0));
        assert_eq!(Weight::from_kilograms(5).grams(), 5_000);
        assert_eq!(Weight::from_grams(500).times(3), Weight::from_grams(1_500));
        assert_eq!(Weight::from_grams(2_500).to_string(), "2.500 kg");
    }

    #[test]
    fn test_weight_sum() {
        let total: Weight = [Weight::from_grams(200), Weight::from_grams(800)]
            .into_iter()
            .sum();
        assert_eq!(total, Weight::from_kilograms(1));
    }
}
