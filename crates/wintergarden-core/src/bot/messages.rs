//! Reply templates.

use crate::engine::IncrementSummary;
use crate::reward::CATERPILLAR_PENALTY;
use crate::storage::{LeaderboardRow, ResetSummary};

pub const WELCOME: &str = "🌿 Welcome to the Winter Garden!\n\
Send /add <stitches> after each session. Every 500 stitches a flower blooms in your bouquet, \
but watch out for caterpillars 🐛.\n\
/top shows the best gardeners.";

pub const HELP: &str = "/add <n> - record stitches\n\
/top - leaderboard\n\
/export - numbered table of all gardeners\n\
/backup - raw data dump\n\
/reset - wipe the garden (admin only)";

pub const ADD_PROMPT: &str = "How many stitches? Example: /add 120";
pub const ADD_ZERO: &str = "You can't add zero or a negative number of stitches 🤔";
pub const ADD_ERROR: &str = "😔 Sorry, something went wrong while saving your stitches. Please try again later.";
pub const CHAT_DENIED: &str = "⛔️ This command is only available in the main chat.";
pub const EMPTY_BOUQUET: &str = "no flowers yet";
pub const TOP_EMPTY: &str = "The garden is empty so far. Be the first: /add <stitches>";
pub const TOP_ERROR: &str = "😔 Sorry, the leaderboard is unavailable right now.";
pub const NO_FLOWERS: &str = "no flowers";
pub const BACKUP_DENIED: &str = "⛔️ Backups are only available in the main chat.";
pub const RESET_DENIED: &str = "⛔️ Only the garden keeper can reset progress.";

/// Caterpillar and flower notices followed by the new total.
pub fn add_success(summary: &IncrementSummary) -> String {
    let mut text = String::new();
    if summary.caterpillar {
        text.push_str(&format!(
            "🐛 A caterpillar crept in and ate {CATERPILLAR_PENALTY} stitches!\n"
        ));
    }
    match summary.flowers_granted {
        0 => {}
        1 => text.push_str("🌸 A new flower bloomed in your bouquet!\n"),
        n => text.push_str(&format!("💐 {n} new flowers bloomed in your bouquet!\n")),
    }

    let bouquet = if summary.bouquet.is_empty() {
        EMPTY_BOUQUET.to_string()
    } else {
        summary.bouquet.join(" ")
    };
    text.push_str(&format!(
        "🧵 {}, you now have {} stitches.\nYour bouquet: {bouquet}",
        summary.display_name, summary.stitches
    ));
    text
}

pub fn leaderboard(rows: &[LeaderboardRow]) -> String {
    if rows.is_empty() {
        return TOP_EMPTY.to_string();
    }
    let mut text = String::from("🏆 Top gardeners:\n");
    for (i, row) in rows.iter().enumerate() {
        let flowers = if row.bouquet.is_empty() {
            NO_FLOWERS
        } else {
            row.bouquet.as_str()
        };
        text.push_str(&format!(
            "{}. {} - {} stitches - {flowers}\n",
            i + 1,
            row.display_name,
            row.stitch_count
        ));
    }
    text
}

/// `detail` is only passed for the admin.
pub fn backup_error(detail: Option<&str>) -> String {
    with_detail("😔 Sorry, the backup could not be created.", detail)
}

pub fn reset_done(summary: &ResetSummary) -> String {
    format!(
        "🧹 The garden has been reset: {} gardeners and {} flowers removed.",
        summary.deleted_users, summary.deleted_flowers
    )
}

/// `detail` is only passed for the admin.
pub fn reset_error(detail: Option<&str>) -> String {
    with_detail("😔 Sorry, the reset failed.", detail)
}

fn with_detail(base: &str, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("{base}\nError: {detail}"),
        None => base.to_string(),
    }
}
