use clap::{Args, Subcommand};

use super::{confirm, OutputFormat};
use vegstock::client::ApiClient;
use vegstock::models::{Category, VegetableDraft, VegetableId};

#[derive(Args)]
pub struct VegetableCommand {
    #[command(subcommand)]
    pub command: VegetableSubcommand,
}

#[derive(Subcommand)]
pub enum VegetableSubcommand {
    /// Add a vegetable to the catalog
    Add {
        /// Name of the vegetable
        name: String,

        /// Unit price
        #[arg(long)]
        price: f64,

        /// Category (stem, root, bulb, leaves, fruits, herb, seeds, vegetable)
        #[arg(long)]
        category: Category,

        /// Photo URL
        #[arg(long)]
        photo: Option<String>,
    },

    /// List the catalog
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a vegetable's details
    Show {
        /// Vegetable ID (24 hex characters)
        id: VegetableId,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Replace a vegetable's fields
    Update {
        /// Vegetable ID (24 hex characters)
        id: VegetableId,

        /// Name of the vegetable
        #[arg(long)]
        name: String,

        /// Unit price
        #[arg(long)]
        price: f64,

        /// Category
        #[arg(long)]
        category: Category,

        /// Photo URL (kept as is when omitted)
        #[arg(long)]
        photo: Option<String>,
    },

    /// Delete a vegetable
    Delete {
        /// Vegetable ID (24 hex characters)
        id: VegetableId,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

fn draft(name: &str, price: f64, category: Category, photo: &Option<String>) -> VegetableDraft {
    let draft = VegetableDraft::new(name, price, category);
    match photo {
        Some(photo) => draft.with_photo(photo),
        None => draft,
    }
}

impl VegetableCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            VegetableSubcommand::Add {
                name,
                price,
                category,
                photo,
            } => {
                let reply = client
                    .create_vegetable(&draft(name, *price, *category, photo))
                    .await?;
                println!("{}: {}", reply.message, reply.id);
                Ok(())
            }

            VegetableSubcommand::List { format } => {
                let fetch = client.list_vegetables().await?;
                if fetch.from_cache {
                    eprintln!("Server unreachable, showing cached catalog");
                }
                let vegetables = fetch.vegetables;

                if vegetables.is_empty() {
                    println!("No vegetables found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&vegetables)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<24}  {:<24}  {:<10}  PRICE",
                            "ID", "NAME", "CATEGORY"
                        );
                        println!("{}", "-".repeat(72));
                        for veg in &vegetables {
                            let name = if veg.name.chars().count() > 24 {
                                format!("{}...", veg.name.chars().take(21).collect::<String>())
                            } else {
                                veg.name.clone()
                            };
                            println!(
                                "{:<24}  {:<24}  {:<10}  {:.2}",
                                veg.id, name, veg.category, veg.price
                            );
                        }
                        println!("\nTotal: {} vegetable(s)", vegetables.len());
                    }
                }
                Ok(())
            }

            VegetableSubcommand::Show { id, format } => {
                let vegetable = client.get_vegetable(id).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&vegetable)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", vegetable);
                    }
                }
                Ok(())
            }

            VegetableSubcommand::Update {
                id,
                name,
                price,
                category,
                photo,
            } => {
                let reply = client
                    .update_vegetable(id, &draft(name, *price, *category, photo))
                    .await?;
                println!("{}", reply.message);
                Ok(())
            }

            VegetableSubcommand::Delete { id, force } => {
                let vegetable = client.get_vegetable(id).await?;

                // Confirm deletion unless --force is used
                if !force && !confirm(&format!("Delete vegetable '{}'?", vegetable.name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let reply = client.delete_vegetable(id).await?;
                println!("{}: {}", reply.message, vegetable.name);
                Ok(())
            }
        }
    }
}
