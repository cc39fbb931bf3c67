use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::RecordId;

/// Field set of a record: everything except its `id`, as a JSON object.
///
/// `serde_json::Map` compares keys order-independently and values deeply,
/// which is exactly the change test reconciliation needs.
pub type Fields = serde_json::Map<String, Value>;

/// A record failed editor validation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{record}: {message}")]
pub struct ValidationError {
    /// Id (or type) of the offending record
    pub record: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            message: message.into(),
        }
    }
}

/// A configuration record that can be edited locally and reconciled against
/// the store.
pub trait SyncRecord: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Table holding this record type in the store.
    const TABLE: &'static str;

    fn id(&self) -> &RecordId;

    fn set_id(&mut self, id: RecordId);

    /// Venue this record belongs to.
    fn bar_id(&self) -> &str;

    /// Per-record field rules.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Rules spanning the whole list. Defaults to validating every record.
    fn validate_list(records: &[Self]) -> Result<(), ValidationError> {
        records.iter().try_for_each(|record| record.validate())
    }

    /// Key used to match a snapshot record with its working-copy counterpart.
    /// Records whose key changed are deleted and recreated, not updated.
    fn match_key(&self) -> String {
        self.id().to_string()
    }

    /// The serialized record with `id` removed.
    fn fields(&self) -> Fields {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("id");
                map
            }
            _ => Fields::new(),
        }
    }

    /// Rebuilds a record from a field set and the id the store assigned.
    fn from_fields(id: RecordId, mut fields: Fields) -> Result<Self, serde_json::Error> {
        fields.insert("id".to_string(), Value::String(id.to_string()));
        serde_json::from_value(Value::Object(fields))
    }
}
