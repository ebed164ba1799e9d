mod config_cmd;
mod stock;
mod vegetable;

use clap::ValueEnum;

pub use config_cmd::ConfigCommand;
pub use stock::StockCommand;
pub use vegetable::VegetableCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Asks a yes/no question on stdin; anything but `y` is a no.
pub(crate) fn confirm(prompt: &str) -> std::io::Result<bool> {
    use std::io::{self, Write};

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
