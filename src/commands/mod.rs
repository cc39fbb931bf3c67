mod apply;
mod config_cmd;
mod drinks;
mod seats;

pub use apply::ApplyCommand;
pub use config_cmd::ConfigCommand;
pub use drinks::DrinksCommand;
pub use seats::SeatsCommand;

use clap::ValueEnum;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::broadcast;

use barkeep::db::{init_db, DrinkOptionRepository, SeatOptionRepository};
use barkeep::{
    BackendKind, Config, DrinkOption, Gateway, Notice, Notifier, RestGateway, SaveCoordinator,
    SeatOption,
};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

type Gateways = (Arc<dyn Gateway<SeatOption>>, Arc<dyn Gateway<DrinkOption>>);

/// Builds the gateways for the configured backend.
async fn gateways(config: &Config) -> Result<Gateways, Box<dyn Error>> {
    match config.backend.value {
        BackendKind::Remote => {
            let rest = Arc::new(RestGateway::from_config(&config.remote)?);
            let seats: Arc<dyn Gateway<SeatOption>> = rest.clone();
            let drinks: Arc<dyn Gateway<DrinkOption>> = rest;
            Ok((seats, drinks))
        }
        BackendKind::Local => {
            let pool = init_db(&config.database_path.value).await?;
            let seats: Arc<dyn Gateway<SeatOption>> =
                Arc::new(SeatOptionRepository::new(pool.clone()));
            let drinks: Arc<dyn Gateway<DrinkOption>> = Arc::new(DrinkOptionRepository::new(pool));
            Ok((seats, drinks))
        }
    }
}

/// One venue opened for editing, with its notices captured for printing.
pub struct Session {
    pub venue: SaveCoordinator,
    notices: broadcast::Receiver<Notice>,
}

impl Session {
    /// Opens the venue named on the command line, or the configured default.
    pub async fn open(config: &Config, bar: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let bar_id = bar
            .map(str::to_string)
            .or_else(|| config.bar_id.value.clone())
            .ok_or("No venue given. Pass --bar or set bar_id in config.")?;

        let (seats, drinks) = gateways(config).await?;
        let notifier = Notifier::default();
        let notices = notifier.subscribe();
        let venue = SaveCoordinator::load(bar_id, seats, drinks, notifier).await?;

        Ok(Self { venue, notices })
    }

    /// Saves and prints whatever the save reported.
    pub async fn save(&mut self) -> Result<(), Box<dyn Error>> {
        if !self.venue.is_dirty() {
            println!("No changes to save");
            return Ok(());
        }

        let summary = self.venue.save().await;
        while let Ok(notice) = self.notices.try_recv() {
            println!("[{}] {}", notice.level, notice.message);
        }

        if summary.is_success() {
            Ok(())
        } else {
            Err(format!("{} list(s) failed to save", summary.failures().len()).into())
        }
    }
}
