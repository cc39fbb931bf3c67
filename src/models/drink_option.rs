use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{RecordId, SyncRecord, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrinkType {
    SingleDrink,
    Bottle,
}

impl fmt::Display for DrinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrinkType::SingleDrink => write!(f, "single_drink"),
            DrinkType::Bottle => write!(f, "bottle"),
        }
    }
}

impl FromStr for DrinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "single_drink" | "single" => Ok(DrinkType::SingleDrink),
            "bottle" => Ok(DrinkType::Bottle),
            _ => Err(format!(
                "Invalid drink type '{}'. Valid options: single_drink, bottle",
                s
            )),
        }
    }
}

/// A drink offered for pre-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrinkOption {
    pub id: RecordId,
    pub bar_id: String,
    #[serde(rename = "type")]
    pub drink_type: DrinkType,
    pub name: Option<String>,
    pub price: f64,
}

impl DrinkOption {
    pub fn new(bar_id: impl Into<String>, drink_type: DrinkType, price: f64) -> Self {
        Self {
            id: RecordId::new_local(),
            bar_id: bar_id.into(),
            drink_type,
            name: None,
            price,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name for display, falling back to the drink type.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.drink_type.to_string(),
        }
    }
}

impl SyncRecord for DrinkOption {
    const TABLE: &'static str = "drink_options";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn bar_id(&self) -> &str {
        &self.bar_id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::new(
                self.label(),
                format!("invalid price {}", self.price),
            ));
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ValidationError::new(self.id.to_string(), "name cannot be blank"));
            }
        }
        Ok(())
    }
}
