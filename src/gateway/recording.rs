//! In-memory gateway for tests: keeps rows in a map, records every call, and
//! can be told to reject specific calls.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{Gateway, GatewayError};
use crate::models::{Fields, RecordId, SyncRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(String),
    Create(Fields),
    Update(String, Fields),
    Delete(String),
}

pub struct RecordingGateway<R: SyncRecord> {
    rows: Mutex<BTreeMap<String, R>>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<Vec<Box<dyn Fn(&Call) -> bool + Send + Sync>>>,
    next_id: Mutex<u32>,
}

impl<R: SyncRecord> RecordingGateway<R> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
        }
    }

    /// Stores records as if they had been persisted, assigning ids to any
    /// local ones. Returns the stored records.
    pub fn seed(&self, records: Vec<R>) -> Vec<R> {
        records
            .into_iter()
            .map(|mut record| {
                if record.id().is_local() {
                    record.set_id(self.mint_id());
                }
                self.rows
                    .lock()
                    .unwrap()
                    .insert(record.id().to_string(), record.clone());
                record
            })
            .collect()
    }

    /// Makes every future call matching `predicate` fail.
    pub fn fail_when(&self, predicate: impl Fn(&Call) -> bool + Send + Sync + 'static) {
        self.failing.lock().unwrap().push(Box::new(predicate));
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than reads.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::List(_)))
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn rows(&self) -> Vec<R> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    fn mint_id(&self) -> RecordId {
        let mut next = self.next_id.lock().unwrap();
        let id = RecordId::persisted(format!("p{}", *next));
        *next += 1;
        id
    }

    fn record(&self, call: Call) -> Result<(), GatewayError> {
        let fails = self.failing.lock().unwrap().iter().any(|f| f(&call));
        self.calls.lock().unwrap().push(call.clone());
        if fails {
            return Err(GatewayError::Rejected(format!("{:?}", call)));
        }
        Ok(())
    }
}

#[async_trait]
impl<R: SyncRecord> Gateway<R> for RecordingGateway<R> {
    async fn list(&self, bar_id: &str) -> Result<Vec<R>, GatewayError> {
        self.record(Call::List(bar_id.to_string()))?;
        Ok(self
            .rows()
            .into_iter()
            .filter(|r| r.bar_id() == bar_id)
            .collect())
    }

    async fn create(&self, fields: Fields) -> Result<R, GatewayError> {
        self.record(Call::Create(fields.clone()))?;
        let record = R::from_fields(self.mint_id(), fields)?;
        self.rows
            .lock()
            .unwrap()
            .insert(record.id().to_string(), record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, fields: Fields) -> Result<R, GatewayError> {
        self.record(Call::Update(id.to_string(), fields.clone()))?;
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(id) {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        let record = R::from_fields(RecordId::persisted(id), fields)?;
        rows.insert(id.to_string(), record.clone());
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        self.record(Call::Delete(id.to_string()))?;
        self.rows.lock().unwrap().remove(id);
        Ok(())
    }
}
