pub mod add;
pub mod chat;
pub mod config;
pub mod export;
pub mod reset;
pub mod top;
pub mod user;

use wintergarden_core::{Config, Garden};

/// Open the configured garden.
pub fn open_garden(config: &Config) -> Result<Garden, Box<dyn std::error::Error>> {
    Ok(Garden::from_config(config)?)
}
