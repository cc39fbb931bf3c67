//! In-memory editing of one venue's list of configuration records.

use std::collections::HashMap;
use std::hash::Hash;
use thiserror::Error;
use tokio::sync::watch;

use crate::gateway::{Gateway, GatewayError};
use crate::models::{RecordId, SyncRecord, ValidationError};
use crate::reconcile::{diff, Changeset};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("No row with id {0}")]
    NotFound(RecordId),

    #[error("Invalid row: {0}")]
    Invalid(#[from] ValidationError),
}

/// Holds the snapshot a list was loaded from and the working copy the user
/// edits.
///
/// The snapshot never changes after construction except through
/// [`ListEditor::reset`], which is how a fresh fetch replaces it after a save.
/// Every mutation recomputes the dirty flag and publishes it to subscribers
/// when it flips.
pub struct ListEditor<R: SyncRecord> {
    initial: Vec<R>,
    current: Vec<R>,
    dirty: watch::Sender<bool>,
}

impl<R: SyncRecord> ListEditor<R> {
    pub fn new(snapshot: Vec<R>) -> Self {
        let (dirty, _) = watch::channel(false);
        Self {
            current: snapshot.clone(),
            initial: snapshot,
            dirty,
        }
    }

    /// Fetches a venue's records and starts editing them.
    pub async fn load<G>(gateway: &G, bar_id: &str) -> Result<Self, GatewayError>
    where
        G: Gateway<R> + ?Sized,
    {
        let snapshot = gateway.list(bar_id).await?;
        tracing::debug!(table = R::TABLE, bar_id, rows = snapshot.len(), "loaded snapshot");
        Ok(Self::new(snapshot))
    }

    /// The list as it was when loading finished.
    pub fn initial(&self) -> &[R] {
        &self.initial
    }

    /// The list as currently edited.
    pub fn current(&self) -> &[R] {
        &self.current
    }

    pub fn is_dirty(&self) -> bool {
        *self.dirty.borrow()
    }

    /// Receives the dirty flag each time it changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.dirty.subscribe()
    }

    pub fn find(&self, id: &RecordId) -> Option<&R> {
        self.current.iter().find(|r| r.id() == id)
    }

    /// Appends a row under a fresh local id and returns that id.
    pub fn add(&mut self, mut record: R) -> RecordId {
        let id = RecordId::new_local();
        record.set_id(id.clone());
        self.current.push(record);
        self.refresh_dirty();
        id
    }

    /// Edits a row in place. The row keeps its id whatever `f` does.
    pub fn edit<F>(&mut self, id: &RecordId, f: F) -> Result<(), EditorError>
    where
        F: FnOnce(&mut R),
    {
        let row = self
            .current
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| EditorError::NotFound(id.clone()))?;
        f(row);
        row.set_id(id.clone());
        self.refresh_dirty();
        Ok(())
    }

    pub fn remove(&mut self, id: &RecordId) -> Result<R, EditorError> {
        let index = self
            .current
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| EditorError::NotFound(id.clone()))?;
        let removed = self.current.remove(index);
        self.refresh_dirty();
        Ok(removed)
    }

    /// Replaces the working copy with `desired`, keeping the id of every
    /// existing row whose key matches a desired row. Unmatched desired rows
    /// get local ids; unmatched existing rows are dropped.
    pub fn merge_by<K, F>(&mut self, desired: Vec<R>, key: F)
    where
        K: Eq + Hash,
        F: Fn(&R) -> K,
    {
        let mut existing: HashMap<K, RecordId> = self
            .current
            .iter()
            .map(|r| (key(r), r.id().clone()))
            .collect();

        self.current = desired
            .into_iter()
            .map(|mut record| {
                let id = existing
                    .remove(&key(&record))
                    .unwrap_or_else(RecordId::new_local);
                record.set_id(id);
                record
            })
            .collect();
        self.refresh_dirty();
    }

    /// Checks every row and the list-level rules.
    pub fn validate(&self) -> Result<(), EditorError> {
        R::validate_list(&self.current)?;
        Ok(())
    }

    /// The writes a save would issue right now.
    pub fn changes(&self) -> Changeset {
        diff(&self.initial, &self.current)
    }

    /// Starts over from a fresh snapshot, dropping all edits.
    pub fn reset(&mut self, snapshot: Vec<R>) {
        self.current = snapshot.clone();
        self.initial = snapshot;
        self.refresh_dirty();
    }

    fn refresh_dirty(&self) {
        let dirty = !self.changes().is_empty();
        self.dirty.send_if_modified(|value| {
            if *value == dirty {
                return false;
            }
            *value = dirty;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::recording::RecordingGateway;
    use crate::models::{DrinkOption, DrinkType, SeatOption, SeatType};

    fn persisted_seats() -> Vec<SeatOption> {
        RecordingGateway::new().seed(vec![
            SeatOption::new("bar-1", SeatType::Bar).with_available_count(10),
            SeatOption::new("bar-1", SeatType::Table).with_available_count(4),
        ])
    }

    #[tokio::test]
    async fn test_load_builds_snapshot_and_copy() {
        let gateway = RecordingGateway::new();
        gateway.seed(vec![
            DrinkOption::new("bar-1", DrinkType::Bottle, 80.0),
            DrinkOption::new("bar-2", DrinkType::Bottle, 70.0),
        ]);

        let editor = ListEditor::load(&gateway, "bar-1").await.unwrap();
        assert_eq!(editor.initial().len(), 1);
        assert_eq!(editor.current(), editor.initial());
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_add_assigns_local_id() {
        let mut editor = ListEditor::new(persisted_seats());
        let id = editor.add(SeatOption::new("bar-1", SeatType::Vip));

        assert!(id.is_local());
        assert_eq!(editor.find(&id).unwrap().seat_type, SeatType::Vip);
        assert!(editor.is_dirty());
        assert_eq!(editor.initial().len(), 2);
    }

    #[test]
    fn test_add_then_remove_is_clean() {
        let mut editor = ListEditor::new(persisted_seats());
        let id = editor.add(SeatOption::new("bar-1", SeatType::Vip));
        editor.remove(&id).unwrap();

        assert!(!editor.is_dirty());
        assert!(editor.changes().is_empty());
    }

    #[test]
    fn test_edit_back_to_original_is_clean() {
        let mut editor = ListEditor::new(persisted_seats());
        let id = editor.current()[0].id.clone();

        editor.edit(&id, |s| s.available_count = 3).unwrap();
        assert!(editor.is_dirty());

        editor.edit(&id, |s| s.available_count = 10).unwrap();
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_edit_cannot_change_id() {
        let mut editor = ListEditor::new(persisted_seats());
        let id = editor.current()[0].id.clone();

        editor
            .edit(&id, |s| s.id = RecordId::persisted("hijacked"))
            .unwrap();
        assert!(editor.find(&id).is_some());
    }

    #[test]
    fn test_missing_row() {
        let mut editor = ListEditor::new(persisted_seats());
        let ghost = RecordId::persisted("nope");
        assert_eq!(
            editor.remove(&ghost).unwrap_err(),
            EditorError::NotFound(ghost.clone())
        );
        assert!(editor.edit(&ghost, |_| {}).is_err());
    }

    #[test]
    fn test_subscribe_sees_flips_only() {
        let mut editor = ListEditor::new(persisted_seats());
        let mut rx = editor.subscribe();
        let id = editor.current()[0].id.clone();

        editor.edit(&id, |s| s.available_count = 1).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());

        editor.edit(&id, |s| s.available_count = 2).unwrap();
        assert!(!rx.has_changed().unwrap());

        editor.edit(&id, |s| s.available_count = 10).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
    }

    #[test]
    fn test_validate_reports_duplicates() {
        let mut editor = ListEditor::new(persisted_seats());
        editor.add(SeatOption::new("bar-1", SeatType::Bar));
        assert!(matches!(editor.validate(), Err(EditorError::Invalid(_))));
    }

    #[test]
    fn test_merge_by_keeps_matching_ids() {
        let mut editor = ListEditor::new(persisted_seats());
        let bar_id = editor.current()[0].id.clone();

        editor.merge_by(
            vec![
                SeatOption::new("bar-1", SeatType::Bar).with_available_count(12),
                SeatOption::new("bar-1", SeatType::Vip),
            ],
            |s| s.seat_type,
        );

        let changes = editor.changes();
        assert_eq!(editor.current()[0].id, bar_id);
        assert_eq!(changes.updates.len(), 1);
        assert_eq!(changes.additions.len(), 1);
        assert_eq!(changes.deletions.len(), 1);
    }

    #[test]
    fn test_reset_replaces_snapshot() {
        let mut editor = ListEditor::new(persisted_seats());
        editor.add(SeatOption::new("bar-1", SeatType::Vip));

        editor.reset(Vec::new());
        assert!(editor.initial().is_empty());
        assert!(editor.current().is_empty());
        assert!(!editor.is_dirty());
    }
}
