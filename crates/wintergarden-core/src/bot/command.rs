//! Chat command parsing.

use crate::error::ValidationError;

/// A recognised slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Add(u64),
    Top,
    Export,
    Backup,
    Reset,
}

/// Parse a message text into a command.
///
/// Returns `None` for plain messages, unknown commands and commands
/// addressed to another bot (`/top@otherbot`). `/add` arguments are
/// validated here: the amount must be plain ASCII digits and positive.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Result<Command, ValidationError>> {
    let mut words = text.split_whitespace();
    let head = words.next()?.strip_prefix('/')?;

    let name = match head.split_once('@') {
        Some((name, target)) => {
            let ours = bot_username
                .map(|u| u.trim_start_matches('@'))
                .is_some_and(|u| u.eq_ignore_ascii_case(target));
            if !ours {
                return None;
            }
            name
        }
        None => head,
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "top" => Command::Top,
        "export" => Command::Export,
        "backup" => Command::Backup,
        "reset" => Command::Reset,
        "add" => return Some(parse_amount(words.next()).map(Command::Add)),
        _ => return None,
    };
    Some(Ok(command))
}

fn parse_amount(raw: Option<&str>) -> Result<u64, ValidationError> {
    let raw = raw.ok_or(ValidationError::MissingAmount)?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidAmount { raw: raw.to_string() });
    }
    let amount: u64 = raw
        .parse()
        .map_err(|_| ValidationError::AmountTooLarge { raw: raw.to_string() })?;
    if amount == 0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    if i64::try_from(amount).is_err() {
        return Err(ValidationError::AmountTooLarge { raw: raw.to_string() });
    }
    Ok(amount)
}
