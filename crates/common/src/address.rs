use serde::{Deserialize, Serialize};

/// Postal address, stored as a JSON document on the order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub recipient: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub postal_code: String,
    pub city: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

impl Address {
    pub fn new(
        recipient: impl Into<String>,
        line1: impl Into<String>,
        postal_code: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            line1: line1.into(),
            line2: None,
            postal_code: postal_code.into(),
            city: city.into(),
            country: country.into(),
        }
    }

    pub fn with_line2(mut self, line2: impl Into<String>) -> Self {
        self.line2 = Some(line2.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_omits_empty_line2() {
        let address = Address::new("Jeanne Martin", "1 rue de Rivoli", "75001", "Paris", "FR");
        let json = serde_json::to_value(&address).unwrap();
        assert!(json.get("line2").is_none());
        let parsed: Address = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, address);

        let with_line2 = address.with_line2("Bâtiment B");
        let json = serde_json::to_value(&with_line2).unwrap();
        assert_eq!(json["line2"], "Bâtiment B");
    }
}
