//! Reconciles an edited working copy against the snapshot it was loaded from.
//!
//! [`diff`] classifies every record into one of three batches:
//! - deletions: snapshot records missing from the working copy (persisted ids only)
//! - additions: working-copy records missing from the snapshot, including
//!   persisted records whose match key changed
//! - updates: records present in both whose field sets differ (persisted ids only)
//!
//! [`Changeset::apply`] runs the batches in that order. Calls inside a batch
//! run concurrently and all of them settle before the next batch starts.
//! Deleting first keeps a removed row from colliding with a new row that
//! reuses one of its unique columns.
//!
//! Applying the same changeset twice repeats its creates. After a successful
//! save the caller must reload the snapshot so the new persisted ids become
//! the baseline.

use futures::future::{join_all, BoxFuture};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

use crate::gateway::{Gateway, GatewayError};
use crate::models::{Fields, SyncRecord};

/// The writes needed to make the store match a working copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Changeset {
    /// Persisted ids to delete
    pub deletions: Vec<String>,
    /// Field sets to insert, local ids already stripped
    pub additions: Vec<Fields>,
    /// Persisted id and full replacement field set
    pub updates: Vec<(String, Fields)>,
}

/// Which batch an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Delete,
    Create,
    Update,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Delete => write!(f, "delete"),
            Stage::Create => write!(f, "create"),
            Stage::Update => write!(f, "update"),
        }
    }
}

/// A single gateway write.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Delete(String),
    Create(Fields),
    Update(String, Fields),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Delete(id) => write!(f, "delete {}", id),
            Operation::Create(fields) => match fields.get("type") {
                Some(kind) => write!(f, "create {}", kind),
                None => write!(f, "create"),
            },
            Operation::Update(id, _) => write!(f, "update {}", id),
        }
    }
}

#[derive(Debug)]
pub struct OpFailure {
    pub operation: Operation,
    pub error: GatewayError,
}

/// Counts of the writes that went through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub deleted: usize,
    pub created: usize,
    pub updated: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.deleted + self.created + self.updated
    }
}

/// A batch had at least one rejected call.
///
/// Later batches were not started. Nothing that succeeded was rolled back:
/// `completed` counts those writes, and `pending` holds exactly the failed
/// calls plus the batches that never ran, ready for [`Changeset::apply`].
#[derive(Error, Debug)]
#[error("{stage} batch failed: {} of {attempted} call(s) rejected", .failures.len())]
pub struct ReconcileError {
    pub stage: Stage,
    pub attempted: usize,
    pub failures: Vec<OpFailure>,
    pub completed: SyncReport,
    pub pending: Changeset,
}

/// Computes the writes that turn `initial` into `current`.
pub fn diff<R: SyncRecord>(initial: &[R], current: &[R]) -> Changeset {
    let before: HashMap<String, &R> = initial.iter().map(|r| (r.match_key(), r)).collect();
    let after: HashSet<String> = current.iter().map(|r| r.match_key()).collect();

    let deletions = initial
        .iter()
        .filter(|r| !after.contains(&r.match_key()))
        .filter_map(|r| r.id().as_persisted().map(str::to_string))
        .collect();

    let additions = current
        .iter()
        .filter(|r| !before.contains_key(&r.match_key()))
        .map(|r| r.fields())
        .collect();

    let updates = current
        .iter()
        .filter_map(|r| {
            let id = r.id().as_persisted()?;
            let old = before.get(&r.match_key())?;
            let fields = r.fields();
            (fields != old.fields()).then(|| (id.to_string(), fields))
        })
        .collect();

    Changeset {
        deletions,
        additions,
        updates,
    }
}

/// Diffs `initial` against `current` and applies the result.
pub async fn reconcile<R, G>(
    gateway: &G,
    initial: &[R],
    current: &[R],
) -> Result<SyncReport, ReconcileError>
where
    R: SyncRecord,
    G: Gateway<R> + ?Sized,
{
    let changeset = diff(initial, current);
    if changeset.is_empty() {
        tracing::debug!(table = R::TABLE, "nothing to reconcile");
        return Ok(SyncReport::default());
    }
    changeset.apply(gateway).await
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.additions.is_empty() && self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deletions.len() + self.additions.len() + self.updates.len()
    }

    fn push(&mut self, operation: Operation) {
        match operation {
            Operation::Delete(id) => self.deletions.push(id),
            Operation::Create(fields) => self.additions.push(fields),
            Operation::Update(id, fields) => self.updates.push((id, fields)),
        }
    }

    /// Issues the writes: deletions, then additions, then updates.
    pub async fn apply<R, G>(&self, gateway: &G) -> Result<SyncReport, ReconcileError>
    where
        R: SyncRecord,
        G: Gateway<R> + ?Sized,
    {
        tracing::info!(
            table = R::TABLE,
            deletions = self.deletions.len(),
            additions = self.additions.len(),
            updates = self.updates.len(),
            "applying changeset"
        );
        let mut report = SyncReport::default();

        let deletes = self
            .deletions
            .iter()
            .map(|id| {
                let call: BoxFuture<'_, Result<(), GatewayError>> = gateway.delete(id);
                (Operation::Delete(id.clone()), call)
            })
            .collect();
        let (deleted, failures) = run_batch(deletes).await;
        report.deleted = deleted;
        if !failures.is_empty() {
            let pending = Changeset {
                additions: self.additions.clone(),
                updates: self.updates.clone(),
                ..Default::default()
            };
            return Err(failed(Stage::Delete, self.deletions.len(), failures, report, pending));
        }

        let creates = self
            .additions
            .iter()
            .map(|fields| {
                let call: BoxFuture<'_, Result<R, GatewayError>> = gateway.create(fields.clone());
                (Operation::Create(fields.clone()), call)
            })
            .collect();
        let (created, failures) = run_batch(creates).await;
        report.created = created;
        if !failures.is_empty() {
            let pending = Changeset {
                updates: self.updates.clone(),
                ..Default::default()
            };
            return Err(failed(Stage::Create, self.additions.len(), failures, report, pending));
        }

        let updates = self
            .updates
            .iter()
            .map(|(id, fields)| {
                let call: BoxFuture<'_, Result<R, GatewayError>> =
                    gateway.update(id, fields.clone());
                (Operation::Update(id.clone(), fields.clone()), call)
            })
            .collect();
        let (updated, failures) = run_batch(updates).await;
        report.updated = updated;
        if !failures.is_empty() {
            let pending = Changeset::default();
            return Err(failed(Stage::Update, self.updates.len(), failures, report, pending));
        }

        Ok(report)
    }
}

/// Builds the error for a failed batch; `pending` already holds the batches
/// that never ran.
fn failed(
    stage: Stage,
    attempted: usize,
    failures: Vec<OpFailure>,
    completed: SyncReport,
    mut pending: Changeset,
) -> ReconcileError {
    for failure in &failures {
        pending.push(failure.operation.clone());
    }
    tracing::warn!(
        %stage,
        failed = failures.len(),
        attempted,
        pending = pending.len(),
        "batch failed, later batches skipped"
    );
    ReconcileError {
        stage,
        attempted,
        failures,
        completed,
        pending,
    }
}

/// Runs every call concurrently and waits for all of them to settle.
async fn run_batch<T>(
    calls: Vec<(Operation, BoxFuture<'_, Result<T, GatewayError>>)>,
) -> (usize, Vec<OpFailure>) {
    let (operations, futures): (Vec<_>, Vec<_>) = calls.into_iter().unzip();
    let results = join_all(futures).await;

    let mut succeeded = 0;
    let mut failures = Vec::new();
    for (operation, result) in operations.into_iter().zip(results) {
        match result {
            Ok(_) => succeeded += 1,
            Err(error) => {
                tracing::warn!(%operation, %error, "gateway call failed");
                failures.push(OpFailure { operation, error });
            }
        }
    }
    (succeeded, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::recording::{Call, RecordingGateway};
    use crate::models::{DrinkOption, DrinkType, RecordId, SeatOption, SeatType};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn seats() -> RecordingGateway<SeatOption> {
        RecordingGateway::new()
    }

    #[test]
    fn test_diff_unmodified_is_empty() {
        let gateway = seats();
        let initial = gateway.seed(vec![
            SeatOption::new("bar-1", SeatType::Bar).with_available_count(10),
            SeatOption::new("bar-1", SeatType::Vip).with_available_count(2),
        ]);
        let changeset = diff(&initial, &initial.clone());
        assert!(changeset.is_empty());
    }

    #[test]
    fn test_diff_disjoint_keys() {
        let gateway = seats();
        let initial = gateway.seed(vec![
            SeatOption::new("bar-1", SeatType::Bar),
            SeatOption::new("bar-1", SeatType::Table),
        ]);
        let current = vec![
            initial[0].clone(),
            SeatOption::new("bar-1", SeatType::Vip),
        ];

        let changeset = diff(&initial, &current);
        assert_eq!(changeset.deletions, vec![initial[1].id.to_string()]);
        assert_eq!(changeset.additions.len(), 1);
        assert!(changeset.updates.is_empty());
    }

    #[test]
    fn test_diff_field_order_does_not_matter() {
        let gateway = RecordingGateway::<DrinkOption>::new();
        let initial = gateway.seed(vec![DrinkOption::new("bar-1", DrinkType::Bottle, 50.0)]);

        let mut reordered = Fields::new();
        let fields = initial[0].fields();
        for key in fields.keys().rev() {
            reordered.insert(key.clone(), fields[key].clone());
        }
        let rebuilt = DrinkOption::from_fields(initial[0].id.clone(), reordered).unwrap();

        assert!(diff(&initial, &[rebuilt]).is_empty());
    }

    #[test]
    fn test_diff_whitespace_change_is_an_update() {
        let gateway = RecordingGateway::<DrinkOption>::new();
        let initial = gateway.seed(vec![
            DrinkOption::new("bar-1", DrinkType::SingleDrink, 9.0).with_name("Spritz"),
        ]);
        let mut current = initial.clone();
        current[0].name = Some("Spritz ".to_string());

        assert_eq!(diff(&initial, &current).updates.len(), 1);
    }

    #[test]
    fn test_diff_seat_type_change_is_replace() {
        let gateway = seats();
        let initial = gateway.seed(vec![SeatOption::new("bar-1", SeatType::Bar)]);
        let mut current = initial.clone();
        current[0].seat_type = SeatType::Vip;

        let changeset = diff(&initial, &current);

        assert_eq!(changeset.deletions, vec![initial[0].id.to_string()]);
        assert_eq!(changeset.additions.len(), 1);
        assert_eq!(changeset.additions[0]["type"], "vip");
        assert!(!changeset.additions[0].contains_key("id"));
        assert!(changeset.updates.is_empty());
    }

    /// Holds every write until `size` of them are in flight at once.
    struct GatedGateway {
        gate: Arc<Barrier>,
    }

    impl GatedGateway {
        async fn pass(&self) {
            self.gate.wait().await;
        }
    }

    #[async_trait]
    impl Gateway<SeatOption> for GatedGateway {
        async fn list(&self, _bar_id: &str) -> Result<Vec<SeatOption>, GatewayError> {
            Ok(Vec::new())
        }

        async fn create(&self, fields: Fields) -> Result<SeatOption, GatewayError> {
            self.pass().await;
            Ok(SeatOption::from_fields(RecordId::persisted("new"), fields)?)
        }

        async fn update(&self, id: &str, fields: Fields) -> Result<SeatOption, GatewayError> {
            self.pass().await;
            Ok(SeatOption::from_fields(RecordId::persisted(id), fields)?)
        }

        async fn delete(&self, _id: &str) -> Result<(), GatewayError> {
            self.pass().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_calls_within_a_batch_run_concurrently() {
        let changeset = Changeset {
            deletions: vec!["p1".to_string(), "p2".to_string(), "p3".to_string()],
            additions: SeatType::ALL
                .iter()
                .map(|t| SeatOption::new("bar-1", *t).fields())
                .collect(),
            updates: Vec::new(),
        };
        // Each batch has three calls; a barrier of three only opens when all
        // of them are awaiting together.
        let gateway = GatedGateway {
            gate: Arc::new(Barrier::new(3)),
        };

        let report = tokio::time::timeout(Duration::from_secs(5), changeset.apply(&gateway))
            .await
            .expect("batch calls were issued one at a time")
            .unwrap();

        assert_eq!(report, SyncReport { deleted: 3, created: 3, updated: 0 });
    }

    #[tokio::test]
    async fn test_update_only_scenario() {
        let gateway = seats();
        let initial =
            gateway.seed(vec![SeatOption::new("bar-1", SeatType::Bar).with_available_count(10)]);
        let mut current = initial.clone();
        current[0].available_count = 5;

        let report = reconcile(&gateway, &initial, &current).await.unwrap();

        assert_eq!(report, SyncReport { deleted: 0, created: 0, updated: 1 });
        let writes = gateway.writes();
        assert_eq!(writes.len(), 1);
        match &writes[0] {
            Call::Update(id, fields) => {
                assert_eq!(id, &initial[0].id.to_string());
                assert_eq!(fields["available_count"], 5);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_only_scenario_strips_local_id() {
        let gateway = seats();
        let mut vip = SeatOption::new("bar-1", SeatType::Vip);
        vip.id = RecordId::parse("local-1");

        let report = reconcile(&gateway, &[], &[vip]).await.unwrap();

        assert_eq!(report.created, 1);
        let writes = gateway.writes();
        assert_eq!(writes.len(), 1);
        match &writes[0] {
            Call::Create(fields) => {
                assert!(!fields.contains_key("id"));
                assert_eq!(fields["type"], "vip");
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_only_scenario() {
        let gateway = seats();
        let mut table = SeatOption::new("bar-1", SeatType::Table);
        table.id = RecordId::persisted("p1");
        let initial = gateway.seed(vec![table]);

        let report = reconcile(&gateway, &initial, &[]).await.unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(gateway.writes(), vec![Call::Delete("p1".to_string())]);
    }

    #[tokio::test]
    async fn test_unmodified_list_issues_no_calls() {
        let gateway = seats();
        let initial = gateway.seed(vec![SeatOption::new("bar-1", SeatType::Bar)]);

        let report = reconcile(&gateway, &initial, &initial).await.unwrap();

        assert_eq!(report.total(), 0);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_batches_run_in_order() {
        let gateway = seats();
        let initial = gateway.seed(vec![
            SeatOption::new("bar-1", SeatType::Bar).with_available_count(1),
            SeatOption::new("bar-1", SeatType::Table),
        ]);
        let mut kept = initial[0].clone();
        kept.available_count = 2;
        let current = vec![kept, SeatOption::new("bar-1", SeatType::Vip)];

        reconcile(&gateway, &initial, &current).await.unwrap();

        let kinds: Vec<&str> = gateway
            .writes()
            .iter()
            .map(|c| match c {
                Call::Delete(_) => "delete",
                Call::Create(_) => "create",
                Call::Update(..) => "update",
                Call::List(_) => "list",
            })
            .collect();
        assert_eq!(kinds, vec!["delete", "create", "update"]);
    }

    #[tokio::test]
    async fn test_reconciling_twice_duplicates_creates() {
        let gateway = seats();
        let current = vec![SeatOption::new("bar-1", SeatType::Vip)];

        reconcile(&gateway, &[], &current).await.unwrap();
        reconcile(&gateway, &[], &current).await.unwrap();

        assert_eq!(gateway.count(|c| matches!(c, Call::Create(_))), 2);
        assert_eq!(gateway.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_delete_skips_later_batches() {
        let gateway = seats();
        let initial = gateway.seed(vec![
            SeatOption::new("bar-1", SeatType::Bar),
            SeatOption::new("bar-1", SeatType::Table),
        ]);
        let doomed = initial[0].id.to_string();
        let current = vec![SeatOption::new("bar-1", SeatType::Vip)];
        let target = doomed.clone();
        gateway.fail_when(move |c| matches!(c, Call::Delete(id) if *id == target));

        let err = reconcile(&gateway, &initial, &current).await.unwrap_err();

        assert_eq!(err.stage, Stage::Delete);
        assert_eq!(err.attempted, 2);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.completed.deleted, 1);
        assert_eq!(err.pending.deletions, vec![doomed]);
        assert_eq!(err.pending.additions.len(), 1);
        assert_eq!(gateway.count(|c| matches!(c, Call::Create(_))), 0);
        assert!(err.to_string().contains("delete batch failed: 1 of 2"));
    }

    #[tokio::test]
    async fn test_retry_applies_only_pending() {
        let gateway = seats();
        let initial = gateway.seed(vec![
            SeatOption::new("bar-1", SeatType::Bar).with_available_count(1),
            SeatOption::new("bar-1", SeatType::Table).with_available_count(1),
        ]);
        let mut current = initial.clone();
        current[0].available_count = 7;
        current[1].available_count = 8;
        let target = initial[1].id.to_string();
        gateway.fail_when(move |c| matches!(c, Call::Update(id, _) if *id == target));

        let err = reconcile(&gateway, &initial, &current).await.unwrap_err();
        assert_eq!(err.stage, Stage::Update);
        assert_eq!(err.completed.updated, 1);
        assert_eq!(err.pending.len(), 1);

        gateway.heal();
        gateway.clear_calls();
        let report = err.pending.apply(&gateway).await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(gateway.writes().len(), 1);
        let counts: Vec<i32> = gateway.rows().iter().map(|r| r.available_count).collect();
        assert!(counts.contains(&7) && counts.contains(&8));
    }
}
