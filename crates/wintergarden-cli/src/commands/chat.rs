//! Line-oriented chat loop.
//!
//! Each input line is one JSON [`InboundMessage`]; each reply is printed as
//! one JSON line. Malformed lines are logged and skipped so a single bad
//! delivery never stops the loop.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use tracing::{info, warn};
use wintergarden_core::bot::{AccessPolicy, InboundMessage, Router};
use wintergarden_core::Config;

pub fn run(config: &Config, input: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let router = Router::new(super::open_garden(config)?, AccessPolicy::from(&config.bot));
    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    info!("garden chat loop started");
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut handled = 0usize;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let message: InboundMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!(line = index + 1, error = %e, "skipping malformed message");
                continue;
            }
        };
        if let Some(reply) = router.handle(&message) {
            writeln!(out, "{}", serde_json::to_string(&reply)?)?;
            out.flush()?;
        }
        handled += 1;
    }
    info!(handled, "garden chat loop finished");
    Ok(())
}
