use clap::Args;
use wintergarden_core::{Config, IncrementOutcome, IncrementRequest};

#[derive(Args)]
pub struct AddArgs {
    /// Chat user id
    #[arg(long, allow_hyphen_values = true)]
    pub user_id: i64,
    /// Display name, used when the gardener is new
    #[arg(long)]
    pub name: String,
    /// Stitches to add
    #[arg(long)]
    pub amount: u64,
    /// Message id for duplicate suppression
    #[arg(long, default_value_t = 0)]
    pub request_id: i64,
}

pub fn run(config: &Config, args: AddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let garden = super::open_garden(config)?;
    let request = IncrementRequest {
        user_id: args.user_id,
        display_name: args.name,
        amount: args.amount,
        request_id: args.request_id,
    };

    match garden.increment(&request)? {
        IncrementOutcome::Applied(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        IncrementOutcome::Duplicate => eprintln!("duplicate request {}, ignored", args.request_id),
    }
    Ok(())
}
