use wintergarden_core::Config;

pub fn run(config: &Config, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !yes {
        return Err("refusing to reset without --yes".into());
    }
    let summary = super::open_garden(config)?.reset_all()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
