use chrono::NaiveDate;
use clap::{Args, Subcommand};
use std::collections::HashMap;

use super::{confirm, OutputFormat};
use vegstock::client::{ApiClient, ClientError};
use vegstock::dates::{format_stock_date, parse_stock_date};
use vegstock::models::{DailyStock, StockEntry, VegetableId};

#[derive(Args)]
pub struct StockCommand {
    #[command(subcommand)]
    pub command: StockSubcommand,
}

#[derive(Subcommand)]
pub enum StockSubcommand {
    /// Add a vegetable to a day's stock, merging with what is there
    Add {
        /// Vegetable ID (24 hex characters)
        id: VegetableId,

        /// Quantity to add
        quantity: f64,

        /// Photo URL for the entry
        #[arg(long)]
        photo: String,

        /// Stock date as YYYY-MM-DD (server's today if omitted)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },

    /// Replace a day's stock with the given entries
    Set {
        /// Stock date as YYYY-MM-DD
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,

        /// Entry as ID:QUANTITY:PHOTO (can be repeated)
        #[arg(long = "entry", value_name = "ID:QTY:PHOTO", value_parser = parse_entry_arg)]
        entries: Vec<StockEntry>,
    },

    /// Show a day's stock
    Show {
        /// YYYY-MM-DD or previous-day (server's today if omitted)
        date: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List every stored day
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a day's stock
    Delete {
        /// Stock date as YYYY-MM-DD
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Remove one vegetable from a day's stock
    Remove {
        /// Stock date as YYYY-MM-DD
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,

        /// Vegetable ID (24 hex characters)
        id: VegetableId,
    },

    /// Carry yesterday's leftovers into a day's stock
    CarryForward {
        /// Target date as YYYY-MM-DD (server's today if omitted)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,

        /// Only carry these vegetable IDs (can be repeated)
        #[arg(long = "only", value_name = "ID")]
        only: Vec<VegetableId>,
    },
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_stock_date(s).ok_or_else(|| format!("'{}' is not a valid YYYY-MM-DD date", s))
}

/// Parses `ID:QTY:PHOTO`. The photo may itself contain colons.
fn parse_entry_arg(s: &str) -> Result<StockEntry, String> {
    let mut parts = s.splitn(3, ':');
    let (Some(id), Some(quantity), Some(photo)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("'{}' is not of the form ID:QTY:PHOTO", s));
    };

    let id = id.parse::<VegetableId>().map_err(|e| e.to_string())?;
    let quantity: f64 = quantity
        .parse()
        .map_err(|_| format!("'{}' is not a number", quantity))?;
    if photo.is_empty() {
        return Err("photo must not be empty".to_string());
    }
    Ok(StockEntry::new(id, quantity, photo))
}

/// Best-effort id to name map for display.
async fn vegetable_names(client: &ApiClient) -> HashMap<VegetableId, String> {
    match client.list_vegetables().await {
        Ok(fetch) => fetch
            .vegetables
            .into_iter()
            .map(|v| (v.id, v.name))
            .collect(),
        Err(e) => {
            tracing::warn!("Could not load vegetables: {}", e);
            eprintln!("Unable to load vegetable data. Displaying IDs only.");
            HashMap::new()
        }
    }
}

fn print_stock(stock: &DailyStock, names: &HashMap<VegetableId, String>) {
    let title = format!("Stock for {}", stock.date);
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));

    if stock.vegetables.is_empty() {
        println!("(no vegetables)");
        return;
    }

    println!("{:<24}  {:<24}  {:>10}  PHOTO", "ID", "NAME", "QUANTITY");
    for entry in stock.vegetables.iter() {
        let name = names.get(&entry.id).map(String::as_str).unwrap_or("-");
        println!(
            "{:<24}  {:<24}  {:>10}  {}",
            entry.id, name, entry.quantity, entry.photo
        );
    }
}

impl StockCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            StockSubcommand::Add {
                id,
                quantity,
                photo,
                date,
            } => {
                let entry = StockEntry::new(*id, *quantity, photo.as_str());
                let reply = client.add_stock(*date, &[entry]).await?;
                println!("{} ({})", reply.message, reply.id);
                Ok(())
            }

            StockSubcommand::Set { date, entries } => {
                let reply = client.replace_stock(*date, entries).await?;
                println!("{} ({})", reply.message, reply.id);
                Ok(())
            }

            StockSubcommand::Show { date, format } => {
                let date = match date {
                    Some(date) => date.clone(),
                    None => format_stock_date(client.health().await?.today),
                };
                let stock = client.get_stock(&date).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&stock)?);
                    }
                    OutputFormat::Text => {
                        let names = vegetable_names(client).await;
                        print_stock(&stock, &names);
                    }
                }
                Ok(())
            }

            StockSubcommand::List { format } => {
                let stocks = client.list_stock().await?;

                if stocks.is_empty() {
                    println!("No daily stock found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&stocks)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<12}  {:>10}  {:>10}", "DATE", "VEGETABLES", "REMAINING");
                        println!("{}", "-".repeat(36));
                        for stock in &stocks {
                            println!(
                                "{:<12}  {:>10}  {:>10}",
                                stock.date.to_string(),
                                stock.vegetables.len(),
                                stock.remaining().count()
                            );
                        }
                        println!("\nTotal: {} day(s)", stocks.len());
                    }
                }
                Ok(())
            }

            StockSubcommand::Delete { date, force } => {
                if !force && !confirm(&format!("Delete stock for {}?", date))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let reply = client.delete_stock(*date).await?;
                println!("{}", reply.message);
                Ok(())
            }

            StockSubcommand::Remove { date, id } => {
                let reply = client.remove_stock_entry(*date, id).await?;
                println!("{}", reply.message);
                Ok(())
            }

            StockSubcommand::CarryForward { date, only } => {
                let report = match client.carry_forward(*date, only).await {
                    Ok(report) => report,
                    Err(ClientError::NothingToCarry) => {
                        println!("Nothing to carry forward from the previous day");
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                };

                let names = vegetable_names(client).await;
                println!("{} ({})", report.message, report.date);
                for entry in &report.carried {
                    let name = names.get(&entry.id).map(String::as_str).unwrap_or("-");
                    println!("  + {} {}  qty: {}", entry.id, name, entry.quantity);
                }
                Ok(())
            }
        }
    }
}
