//! Barkeep: editing a venue's seat and drink configuration against a remote
//! store.
//!
//! Owners edit a working copy of each list ([`editor::ListEditor`]). Saving
//! ([`save::SaveCoordinator`]) diffs the working copy against the snapshot it
//! was loaded from and issues the minimal deletes, creates and updates
//! ([`reconcile`]) through a [`gateway::Gateway`].

pub mod config;
pub mod db;
pub mod editor;
pub mod gateway;
pub mod models;
pub mod notify;
pub mod reconcile;
pub mod save;

pub use config::{BackendKind, Config, ConfigError};
pub use editor::{EditorError, ListEditor};
pub use gateway::{CachedGateway, Gateway, GatewayError, RestGateway};
pub use models::{DrinkOption, DrinkType, RecordId, SeatOption, SeatType, SyncRecord};
pub use notify::{Notice, Notifier};
pub use reconcile::{diff, reconcile, Changeset, ReconcileError, SyncReport};
pub use save::{ListOutcome, SaveCoordinator, SaveError, SaveState, SaveSummary};
