use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Prefix reserved for identifiers minted on the client.
pub const LOCAL_PREFIX: &str = "local-";

/// Identifier of a configuration record.
///
/// A `Persisted` id was assigned by the store. A `Local` id was generated in
/// the current editing session and has never been written anywhere; it is
/// serialized with [`LOCAL_PREFIX`] so it can be told apart from store ids
/// without a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    Persisted(String),
    Local(String),
}

impl RecordId {
    /// Generates a fresh local id.
    pub fn new_local() -> Self {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        RecordId::Local(suffix.to_lowercase())
    }

    pub fn persisted(id: impl Into<String>) -> Self {
        RecordId::Persisted(id.into())
    }

    /// Parses a raw id, treating anything with the local prefix as local.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(LOCAL_PREFIX) {
            Some(rest) => RecordId::Local(rest.to_string()),
            None => RecordId::Persisted(raw.to_string()),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, RecordId::Local(_))
    }

    /// The store id, if this record has been persisted.
    pub fn as_persisted(&self) -> Option<&str> {
        match self {
            RecordId::Persisted(id) => Some(id),
            RecordId::Local(_) => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Persisted(id) => write!(f, "{}", id),
            RecordId::Local(id) => write!(f, "{}{}", LOCAL_PREFIX, id),
        }
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Stores hand out numeric and string keys alike.
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => Ok(RecordId::parse(&s)),
            serde_json::Value::Number(n) => Ok(RecordId::Persisted(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "invalid record id: {}",
                other
            ))),
        }
    }
}
