use clap::{Args, Subcommand};
use serde::Serialize;

use barkeep::models::available_party_sizes;
use barkeep::{Config, SeatOption, SeatType};

use super::{OutputFormat, Session};

#[derive(Args)]
pub struct SeatsCommand {
    #[command(subcommand)]
    pub command: SeatsSubcommand,
}

#[derive(Subcommand)]
pub enum SeatsSubcommand {
    /// List a venue's seat options
    List {
        /// Venue ID (defaults to bar_id from config)
        #[arg(long)]
        bar: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create or change the option for a seat type
    Set {
        /// Seat type (bar, table, vip)
        seat_type: SeatType,

        /// Venue ID (defaults to bar_id from config)
        #[arg(long)]
        bar: Option<String>,

        /// Seats available
        #[arg(long)]
        count: Option<i32>,

        /// Smallest party size
        #[arg(long)]
        min: Option<i32>,

        /// Largest party size
        #[arg(long)]
        max: Option<i32>,

        /// Offer this seat type
        #[arg(long)]
        enable: bool,

        /// Stop offering this seat type
        #[arg(long, conflicts_with = "enable")]
        disable: bool,
    },

    /// Remove the option for a seat type
    Remove {
        /// Seat type (bar, table, vip)
        seat_type: SeatType,

        /// Venue ID (defaults to bar_id from config)
        #[arg(long)]
        bar: Option<String>,
    },
}

#[derive(Serialize)]
struct SeatListing<'a> {
    seat_options: &'a [SeatOption],
    party_sizes: Vec<i32>,
}

impl SeatsCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SeatsSubcommand::List { bar, format } => {
                let session = Session::open(config, bar.as_deref()).await?;
                let options = session.venue.seats().current();
                let listing = SeatListing {
                    seat_options: options,
                    party_sizes: available_party_sizes(options),
                };

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&listing)?);
                    }
                    OutputFormat::Text => {
                        if options.is_empty() {
                            println!("No seat options for {}", session.venue.bar_id());
                            return Ok(());
                        }
                        println!(
                            "{:<8}  {:<8}  {:>9}  {:>5}  {:>5}",
                            "TYPE", "ENABLED", "AVAILABLE", "MIN", "MAX"
                        );
                        println!("{}", "-".repeat(44));
                        for option in options {
                            println!(
                                "{:<8}  {:<8}  {:>9}  {:>5}  {:>5}",
                                option.seat_type.to_string(),
                                if option.enabled { "yes" } else { "no" },
                                option.available_count,
                                option.min_people,
                                option.max_people
                            );
                        }
                        let sizes: Vec<String> =
                            listing.party_sizes.iter().map(i32::to_string).collect();
                        println!("\nBookable party sizes: {}", sizes.join(", "));
                    }
                }
                Ok(())
            }

            SeatsSubcommand::Set {
                seat_type,
                bar,
                count,
                min,
                max,
                enable,
                disable,
            } => {
                let mut session = Session::open(config, bar.as_deref()).await?;
                let bar_id = session.venue.bar_id().to_string();
                let editor = session.venue.seats_mut()?;

                let apply = |option: &mut SeatOption| {
                    if let Some(count) = count {
                        option.available_count = *count;
                    }
                    if let Some(min) = min {
                        option.min_people = *min;
                    }
                    if let Some(max) = max {
                        option.max_people = *max;
                    }
                    if *enable {
                        option.enabled = true;
                    }
                    if *disable {
                        option.enabled = false;
                    }
                };

                let existing = editor
                    .current()
                    .iter()
                    .find(|o| o.seat_type == *seat_type)
                    .map(|o| o.id.clone());
                match existing {
                    Some(id) => editor.edit(&id, apply)?,
                    None => {
                        let mut option = SeatOption::new(bar_id, *seat_type);
                        apply(&mut option);
                        if max.is_none() {
                            option.max_people = option.max_people.max(option.min_people);
                        }
                        editor.add(option);
                    }
                }

                session.save().await
            }

            SeatsSubcommand::Remove { seat_type, bar } => {
                let mut session = Session::open(config, bar.as_deref()).await?;
                let editor = session.venue.seats_mut()?;

                let id = editor
                    .current()
                    .iter()
                    .find(|o| o.seat_type == *seat_type)
                    .map(|o| o.id.clone())
                    .ok_or_else(|| format!("No {} seat option for this venue", seat_type))?;
                editor.remove(&id)?;

                session.save().await
            }
        }
    }
}
