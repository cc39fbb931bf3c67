//! Saving a venue's seat and drink configuration.
//!
//! [`SaveCoordinator`] owns both list editors. A save reconciles each list
//! that has work to do, seat options first, then drink options. A failure in
//! one list neither blocks nor rolls back the other. After a list saves, its
//! cached read is invalidated and the editor restarts from a fresh fetch, so
//! the persisted ids become the next baseline.
//!
//! A list whose save failed keeps the failed writes as a pending changeset
//! and refuses further edits until they are retried or discarded. `save`
//! takes `&mut self`, so no edit or second save can run while one is in
//! flight.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::editor::{EditorError, ListEditor};
use crate::gateway::{CachedGateway, Gateway, GatewayError};
use crate::models::{DrinkOption, SeatOption, SyncRecord};
use crate::notify::Notifier;
use crate::reconcile::{reconcile, Changeset, ReconcileError, SyncReport};

/// Combined save status for front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Saving,
    Saved,
    /// One message per list that failed
    Failed(Vec<String>),
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("{0} have writes from a failed save; retry or discard them first")]
    PendingRetry(&'static str),

    #[error("{0} were saved but could not be reloaded; save again or discard first")]
    Stale(&'static str),
}

/// Why one list failed to save.
#[derive(Error, Debug)]
pub enum ListError {
    #[error(transparent)]
    Invalid(#[from] EditorError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("saved, but reloading failed: {0}")]
    Refresh(#[from] GatewayError),
}

#[derive(Debug)]
pub enum ListOutcome {
    Unchanged,
    Saved(SyncReport),
    Failed(ListError),
}

impl ListOutcome {
    pub fn error(&self) -> Option<&ListError> {
        match self {
            ListOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct SaveSummary {
    pub seats: ListOutcome,
    pub drinks: ListOutcome,
}

impl SaveSummary {
    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }

    pub fn failures(&self) -> Vec<(&'static str, &ListError)> {
        [
            (SeatOption::TABLE, &self.seats),
            (DrinkOption::TABLE, &self.drinks),
        ]
        .into_iter()
        .filter_map(|(table, outcome)| outcome.error().map(|e| (label(table), e)))
        .collect()
    }

    /// Writes that went through across both lists.
    pub fn report(&self) -> SyncReport {
        [&self.seats, &self.drinks]
            .into_iter()
            .fold(SyncReport::default(), |mut total, outcome| {
                let report = match outcome {
                    ListOutcome::Saved(report) => *report,
                    ListOutcome::Failed(ListError::Reconcile(e)) => e.completed,
                    _ => SyncReport::default(),
                };
                total.deleted += report.deleted;
                total.created += report.created;
                total.updated += report.updated;
                total
            })
    }
}

fn label(table: &'static str) -> &'static str {
    match table {
        "seat_options" => "seat options",
        "drink_options" => "drink options",
        other => other,
    }
}

/// One editable list with its gateway and failure bookkeeping.
struct ListSlot<R: SyncRecord> {
    editor: ListEditor<R>,
    gateway: CachedGateway<R>,
    pending: Option<Changeset>,
    stale: bool,
}

impl<R: SyncRecord> ListSlot<R> {
    async fn load(inner: Arc<dyn Gateway<R>>, bar_id: &str) -> Result<Self, GatewayError> {
        let gateway = CachedGateway::new(inner);
        let editor = ListEditor::load(&gateway, bar_id).await?;
        Ok(Self {
            editor,
            gateway,
            pending: None,
            stale: false,
        })
    }

    fn editor_mut(&mut self) -> Result<&mut ListEditor<R>, SaveError> {
        if self.pending.is_some() {
            return Err(SaveError::PendingRetry(label(R::TABLE)));
        }
        if self.stale {
            return Err(SaveError::Stale(label(R::TABLE)));
        }
        Ok(&mut self.editor)
    }

    fn has_work(&self, retry_only: bool) -> bool {
        if retry_only {
            return self.pending.is_some() || self.stale;
        }
        self.pending.is_some() || self.stale || self.editor.is_dirty()
    }

    async fn save(&mut self, bar_id: &str, retry_only: bool) -> ListOutcome {
        if !self.has_work(retry_only) {
            return ListOutcome::Unchanged;
        }

        let result = match self.pending.take() {
            Some(pending) => {
                tracing::info!(table = R::TABLE, writes = pending.len(), "retrying failed writes");
                pending.apply(&self.gateway).await
            }
            // Writes already landed; only the reload is missing.
            None if self.stale => Ok(SyncReport::default()),
            None => {
                if let Err(e) = self.editor.validate() {
                    return ListOutcome::Failed(e.into());
                }
                reconcile(&self.gateway, self.editor.initial(), self.editor.current()).await
            }
        };

        match result {
            Ok(report) => match self.refresh(bar_id).await {
                Ok(()) => ListOutcome::Saved(report),
                Err(e) => ListOutcome::Failed(e.into()),
            },
            Err(e) => {
                self.pending = Some(e.pending.clone());
                ListOutcome::Failed(e.into())
            }
        }
    }

    /// Drops the cached list and restarts the editor from the store.
    async fn refresh(&mut self, bar_id: &str) -> Result<(), GatewayError> {
        self.stale = true;
        self.gateway.invalidate(bar_id);
        let fresh = self.gateway.list(bar_id).await?;
        self.editor.reset(fresh);
        self.stale = false;
        Ok(())
    }

    async fn discard(&mut self, bar_id: &str) -> Result<(), GatewayError> {
        self.pending = None;
        self.refresh(bar_id).await
    }
}

/// Edits and saves one venue's seat and drink options.
pub struct SaveCoordinator {
    bar_id: String,
    seats: ListSlot<SeatOption>,
    drinks: ListSlot<DrinkOption>,
    state: watch::Sender<SaveState>,
    notifier: Notifier,
}

impl SaveCoordinator {
    /// Loads both lists for a venue.
    pub async fn load(
        bar_id: impl Into<String>,
        seats: Arc<dyn Gateway<SeatOption>>,
        drinks: Arc<dyn Gateway<DrinkOption>>,
        notifier: Notifier,
    ) -> Result<Self, GatewayError> {
        let bar_id = bar_id.into();
        let seats = ListSlot::load(seats, &bar_id).await?;
        let drinks = ListSlot::load(drinks, &bar_id).await?;
        let (state, _) = watch::channel(SaveState::Idle);

        Ok(Self {
            bar_id,
            seats,
            drinks,
            state,
            notifier,
        })
    }

    pub fn bar_id(&self) -> &str {
        &self.bar_id
    }

    pub fn seats(&self) -> &ListEditor<SeatOption> {
        &self.seats.editor
    }

    pub fn drinks(&self) -> &ListEditor<DrinkOption> {
        &self.drinks.editor
    }

    pub fn seats_mut(&mut self) -> Result<&mut ListEditor<SeatOption>, SaveError> {
        self.seats.editor_mut()
    }

    pub fn drinks_mut(&mut self) -> Result<&mut ListEditor<DrinkOption>, SaveError> {
        self.drinks.editor_mut()
    }

    /// True while either list has edits or writes that have not landed.
    pub fn is_dirty(&self) -> bool {
        self.seats.has_work(false) || self.drinks.has_work(false)
    }

    pub fn has_pending(&self) -> bool {
        self.seats.pending.is_some() || self.drinks.pending.is_some()
    }

    /// The writes a save would issue right now, per list.
    pub fn changes(&self) -> (Changeset, Changeset) {
        let pending_or_diff = |pending: &Option<Changeset>, diff: Changeset| match pending {
            Some(p) => p.clone(),
            None => diff,
        };
        (
            pending_or_diff(&self.seats.pending, self.seats.editor.changes()),
            pending_or_diff(&self.drinks.pending, self.drinks.editor.changes()),
        )
    }

    pub fn state(&self) -> SaveState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.state.subscribe()
    }

    /// Saves every list with edits, pending writes, or a missed reload.
    pub async fn save(&mut self) -> SaveSummary {
        self.run(false).await
    }

    /// Re-issues only the writes that failed last time.
    pub async fn retry(&mut self) -> SaveSummary {
        self.run(true).await
    }

    /// Forgets failed writes and edits, reloading both lists.
    ///
    /// Both lists are discarded even if one reload fails; the first error is
    /// returned and the failed list stays stale.
    pub async fn discard(&mut self) -> Result<(), GatewayError> {
        let seats = self.seats.discard(&self.bar_id).await;
        let drinks = self.drinks.discard(&self.bar_id).await;
        seats.and(drinks)?;
        self.state.send_replace(SaveState::Idle);
        Ok(())
    }

    async fn run(&mut self, retry_only: bool) -> SaveSummary {
        self.state.send_replace(SaveState::Saving);

        let seats = self.seats.save(&self.bar_id, retry_only).await;
        let drinks = self.drinks.save(&self.bar_id, retry_only).await;
        let summary = SaveSummary { seats, drinks };

        let failures: Vec<String> = summary
            .failures()
            .iter()
            .map(|(list, e)| format!("Could not save {}: {}", list, e))
            .collect();

        if !failures.is_empty() {
            for message in &failures {
                self.notifier.error(message.clone());
            }
            self.state.send_replace(SaveState::Failed(failures));
        } else if matches!(
            (&summary.seats, &summary.drinks),
            (ListOutcome::Unchanged, ListOutcome::Unchanged)
        ) {
            self.state.send_replace(SaveState::Idle);
        } else {
            let report = summary.report();
            self.notifier.success(format!(
                "Saved {}: {} created, {} updated, {} deleted",
                self.bar_id, report.created, report.updated, report.deleted
            ));
            self.state.send_replace(SaveState::Saved);
        }

        summary
    }
}
