use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;

use barkeep::{Config, DrinkOption, DrinkType, SeatOption, SeatType};

use super::Session;

/// Make a venue match a YAML description of its seats and drinks
#[derive(Args)]
pub struct ApplyCommand {
    /// YAML file with `seats:` and/or `drinks:` lists
    file: PathBuf,

    /// Venue ID (defaults to bar_id from config)
    #[arg(long)]
    bar: Option<String>,

    /// Print the writes that would be issued without saving
    #[arg(long)]
    dry_run: bool,
}

/// A list left out of the file is not touched.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct VenueFile {
    seats: Option<Vec<SeatSpec>>,
    drinks: Option<Vec<DrinkSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeatSpec {
    #[serde(rename = "type")]
    seat_type: SeatType,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    available_count: i32,
    #[serde(default = "default_party")]
    min_people: i32,
    #[serde(default = "default_party")]
    max_people: i32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DrinkSpec {
    #[serde(rename = "type")]
    drink_type: DrinkType,
    name: Option<String>,
    price: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_party() -> i32 {
    1
}

impl VenueFile {
    fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    fn seat_options(&self, bar_id: &str) -> Option<Vec<SeatOption>> {
        self.seats.as_ref().map(|specs| {
            specs
                .iter()
                .map(|spec| {
                    SeatOption::new(bar_id, spec.seat_type)
                        .with_enabled(spec.enabled)
                        .with_available_count(spec.available_count)
                        .with_party_size(spec.min_people, spec.max_people)
                })
                .collect()
        })
    }

    fn drink_options(&self, bar_id: &str) -> Option<Vec<DrinkOption>> {
        self.drinks.as_ref().map(|specs| {
            specs
                .iter()
                .map(|spec| {
                    let option = DrinkOption::new(bar_id, spec.drink_type, spec.price);
                    match &spec.name {
                        Some(name) => option.with_name(name.as_str()),
                        None => option,
                    }
                })
                .collect()
        })
    }
}

impl ApplyCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(&self.file)
            .map_err(|e| format!("Failed to read '{}': {}", self.file.display(), e))?;
        let file = VenueFile::parse(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", self.file.display(), e))?;

        let mut session = Session::open(config, self.bar.as_deref()).await?;
        let bar_id = session.venue.bar_id().to_string();

        // Existing rows keep their ids when the desired row has the same key,
        // so unchanged rows produce no writes.
        if let Some(seats) = file.seat_options(&bar_id) {
            session
                .venue
                .seats_mut()?
                .merge_by(seats, |option| option.seat_type);
        }
        if let Some(drinks) = file.drink_options(&bar_id) {
            session
                .venue
                .drinks_mut()?
                .merge_by(drinks, |option| (option.drink_type, option.name.clone()));
        }

        if self.dry_run {
            let (seats, drinks) = session.venue.changes();
            let plan = serde_json::json!({
                "seat_options": seats,
                "drink_options": drinks,
            });
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }

        session.save().await
    }
}
