use wintergarden_core::bot::messages;
use wintergarden_core::Config;

pub fn run(config: &Config, limit: Option<usize>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let garden = super::open_garden(config)?;
    let rows = garden.leaderboard(limit)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", messages::leaderboard(&rows));
        if rows.is_empty() {
            println!();
        }
    }
    Ok(())
}
