use wintergarden_core::Config;

/// Print one gardener with their bouquet.
pub fn run(config: &Config, user_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let garden = super::open_garden(config)?;
    match garden.user(user_id)? {
        Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
        None => return Err(format!("no gardener with id {user_id}").into()),
    }
    Ok(())
}
