use clap::{Args, Subcommand};

use barkeep::{Config, DrinkOption, DrinkType, RecordId};

use super::{OutputFormat, Session};

#[derive(Args)]
pub struct DrinksCommand {
    #[command(subcommand)]
    pub command: DrinksSubcommand,
}

#[derive(Subcommand)]
pub enum DrinksSubcommand {
    /// List a venue's drink options
    List {
        /// Venue ID (defaults to bar_id from config)
        #[arg(long)]
        bar: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a drink option
    Add {
        /// Drink type (single_drink, bottle)
        drink_type: DrinkType,

        /// Price
        #[arg(long)]
        price: f64,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Venue ID (defaults to bar_id from config)
        #[arg(long)]
        bar: Option<String>,
    },

    /// Change a drink option
    Edit {
        /// Drink option ID
        id: String,

        /// New price
        #[arg(long)]
        price: Option<f64>,

        /// New display name (pass an empty string to clear it)
        #[arg(long)]
        name: Option<String>,

        /// New drink type
        #[arg(long = "type")]
        drink_type: Option<DrinkType>,

        /// Venue ID (defaults to bar_id from config)
        #[arg(long)]
        bar: Option<String>,
    },

    /// Remove a drink option
    Remove {
        /// Drink option ID
        id: String,

        /// Venue ID (defaults to bar_id from config)
        #[arg(long)]
        bar: Option<String>,
    },
}

impl DrinksCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            DrinksSubcommand::List { bar, format } => {
                let session = Session::open(config, bar.as_deref()).await?;
                let options = session.venue.drinks().current();

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(options)?);
                    }
                    OutputFormat::Text => {
                        if options.is_empty() {
                            println!("No drink options for {}", session.venue.bar_id());
                            return Ok(());
                        }
                        println!("{:<36}  {:<12}  {:<24}  {:>8}", "ID", "TYPE", "NAME", "PRICE");
                        println!("{}", "-".repeat(86));
                        for option in options {
                            println!(
                                "{:<36}  {:<12}  {:<24}  {:>8.2}",
                                option.id.to_string(),
                                option.drink_type.to_string(),
                                truncate(option.name.as_deref().unwrap_or("-"), 24),
                                option.price
                            );
                        }
                        println!("\nTotal: {} drink option(s)", options.len());
                    }
                }
                Ok(())
            }

            DrinksSubcommand::Add {
                drink_type,
                price,
                name,
                bar,
            } => {
                let mut session = Session::open(config, bar.as_deref()).await?;
                let mut option = DrinkOption::new(session.venue.bar_id(), *drink_type, *price);
                if let Some(name) = name {
                    option = option.with_name(name.as_str());
                }

                session.venue.drinks_mut()?.add(option);
                session.save().await
            }

            DrinksSubcommand::Edit {
                id,
                price,
                name,
                drink_type,
                bar,
            } => {
                let mut session = Session::open(config, bar.as_deref()).await?;
                let id = RecordId::parse(id);

                session.venue.drinks_mut()?.edit(&id, |option| {
                    if let Some(price) = price {
                        option.price = *price;
                    }
                    if let Some(name) = name {
                        option.name = (!name.is_empty()).then(|| name.clone());
                    }
                    if let Some(drink_type) = drink_type {
                        option.drink_type = *drink_type;
                    }
                })?;
                session.save().await
            }

            DrinksSubcommand::Remove { id, bar } => {
                let mut session = Session::open(config, bar.as_deref()).await?;
                let removed = session.venue.drinks_mut()?.remove(&RecordId::parse(id))?;
                println!("Removing {}", removed.label());
                session.save().await
            }
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
