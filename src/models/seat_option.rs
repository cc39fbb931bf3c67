use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use super::{RecordId, SyncRecord, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatType {
    Bar,
    Table,
    Vip,
}

impl SeatType {
    pub const ALL: [SeatType; 3] = [SeatType::Bar, SeatType::Table, SeatType::Vip];
}

impl fmt::Display for SeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatType::Bar => write!(f, "bar"),
            SeatType::Table => write!(f, "table"),
            SeatType::Vip => write!(f, "vip"),
        }
    }
}

impl FromStr for SeatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bar" => Ok(SeatType::Bar),
            "table" => Ok(SeatType::Table),
            "vip" => Ok(SeatType::Vip),
            _ => Err(format!(
                "Invalid seat type '{}'. Valid options: bar, table, vip",
                s
            )),
        }
    }
}

/// A seating category offered by a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatOption {
    pub id: RecordId,
    pub bar_id: String,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
    pub enabled: bool,
    pub available_count: i32,
    pub min_people: i32,
    pub max_people: i32,
}

impl SeatOption {
    /// Creates an enabled option with a fresh local id.
    pub fn new(bar_id: impl Into<String>, seat_type: SeatType) -> Self {
        Self {
            id: RecordId::new_local(),
            bar_id: bar_id.into(),
            seat_type,
            enabled: true,
            available_count: 0,
            min_people: 1,
            max_people: 1,
        }
    }

    pub fn with_available_count(mut self, count: i32) -> Self {
        self.available_count = count;
        self
    }

    pub fn with_party_size(mut self, min: i32, max: i32) -> Self {
        self.min_people = min;
        self.max_people = max;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Party sizes this option can seat right now.
    pub fn party_sizes(&self) -> Vec<i32> {
        if !self.enabled || self.available_count <= 0 || self.min_people > self.max_people {
            return Vec::new();
        }
        (self.min_people.max(1)..=self.max_people).collect()
    }
}

/// Every party size bookable across a venue's seat options, ascending.
pub fn available_party_sizes(options: &[SeatOption]) -> Vec<i32> {
    options
        .iter()
        .flat_map(SeatOption::party_sizes)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl SyncRecord for SeatOption {
    const TABLE: &'static str = "seat_options";

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
        let label = format!("{} seats", self.seat_type);
        if self.available_count < 0 {
            return Err(ValidationError::new(label, "available count cannot be negative"));
        }
        if self.min_people < 1 {
            return Err(ValidationError::new(label, "minimum party size must be at least 1"));
        }
        if self.min_people > self.max_people {
            return Err(ValidationError::new(
                label,
                format!(
                    "minimum party size {} exceeds maximum {}",
                    self.min_people, self.max_people
                ),
            ));
        }
        Ok(())
    }

    /// A seat that changes type is replaced, so the delete of its old row
    /// lands before any create reusing that type.
    fn match_key(&self) -> String {
        format!("{}/{}", self.id, self.seat_type)
    }

    fn validate_list(records: &[Self]) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for option in records {
            option.validate()?;
            if !seen.insert(option.seat_type) {
                return Err(ValidationError::new(
                    format!("{} seats", option.seat_type),
                    "only one option per seat type is allowed",
                ));
            }
        }
        Ok(())
    }
}
