use clap::{Args, Subcommand};
use std::fmt::Display;

use super::OutputFormat;
use vegstock::config::{Config, ConfigValue};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn print_value<T>(key: &str, value: &ConfigValue<T>, render: impl Fn(&T) -> String) {
    println!("{}: {}", key, render(&value.value));
    println!("  source: {}", value.source);
    println!();
}

fn plain<T: Display>(value: &T) -> String {
    value.to_string()
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        print_value("database_path", &config.database_path, |p| {
                            p.display().to_string()
                        });
                        print_value("port", &config.port, plain);
                        print_value("server_url", &config.server_url, plain);
                        print_value("catalog_cache", &config.catalog_cache_path, |p| {
                            p.display().to_string()
                        });
                        print_value("fetch_retries", &config.fetch_retries, plain);
                        print_value("retry_delay_ms", &config.retry_delay_ms, plain);
                    }
                }
                Ok(())
            }
        }
    }
}
