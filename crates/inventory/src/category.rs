use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bizdesk_core::DomainError;

/// Free-form key/value attributes of an item (plate, VIN, serial number, ...).
pub type Attributes = BTreeMap<String, String>;

/// Item category. Decides which attribute keys an item may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electronics,
    Vehicle,
    Furniture,
    Equipment,
    Other,
}

const ELECTRONICS_KEYS: &[&str] = &["serial_number", "brand", "model"];
const VEHICLE_KEYS: &[&str] = &["plate", "vin", "make", "model", "year"];
const FURNITURE_KEYS: &[&str] = &["material", "dimensions", "color"];
const EQUIPMENT_KEYS: &[&str] = &["serial_number", "brand", "model"];

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Electronics,
        Category::Vehicle,
        Category::Furniture,
        Category::Equipment,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::Vehicle => "vehicle",
            Category::Furniture => "furniture",
            Category::Equipment => "equipment",
            Category::Other => "other",
        }
    }

    /// Attribute keys allowed for this category. `None` means any key.
    pub fn permitted_keys(self) -> Option<&'static [&'static str]> {
        match self {
            Category::Electronics => Some(ELECTRONICS_KEYS),
            Category::Vehicle => Some(VEHICLE_KEYS),
            Category::Furniture => Some(FURNITURE_KEYS),
            Category::Equipment => Some(EQUIPMENT_KEYS),
            Category::Other => None,
        }
    }

    pub fn validate_attributes(self, attributes: &Attributes) -> Result<(), DomainError> {
        for (key, value) in attributes {
            if key.trim().is_empty() {
                return Err(DomainError::validation("attribute key cannot be empty"));
            }
            if !key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            {
                return Err(DomainError::validation(format!(
                    "attribute key '{key}' must be lower snake case"
                )));
            }
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "attribute '{key}' cannot be empty"
                )));
            }
            if let Some(keys) = self.permitted_keys() {
                if !keys.contains(&key.as_str()) {
                    return Err(DomainError::validation(format!(
                        "attribute '{key}' is not allowed for category {self} (allowed: {})",
                        keys.join(", ")
                    )));
                }
            }
        }
        Ok(())
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                DomainError::validation(
                    "category must be one of: electronics, vehicle, furniture, equipment, other",
                )
            })
    }
}
