//! Routes inbound chat messages to the garden and builds replies.
//!
//! Every message id passes the duplicate filter exactly once. `/add`,
//! `/export` and `/backup` are limited to the allow-listed chat, `/reset`
//! to the admin; with neither configured, both are refused everywhere. Internal errors are logged in full but only shown to the
//! admin.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::command::{parse_command, Command};
use super::messages;
use crate::engine::IncrementRequest;
use crate::error::{EngineError, ValidationError};
use crate::export::{to_csv, BACKUP_FILENAME, EXPORT_FILENAME};
use crate::garden::{Garden, IncrementOutcome};
use crate::reward::Chance;
use crate::storage::{BotConfig, RecordStore, UserId};

/// Fallback display name for users without a first name.
pub const DEFAULT_DISPLAY_NAME: &str = "Gardener";

/// A chat message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: i64,
    pub chat_id: i64,
    pub user_id: UserId,
    #[serde(default)]
    pub first_name: Option<String>,
    pub text: String,
}

/// What to send back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Text {
        chat_id: i64,
        text: String,
    },
    Document {
        chat_id: i64,
        filename: String,
        content: String,
    },
}

impl Reply {
    fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Reply::Text {
            chat_id,
            text: text.into(),
        }
    }
}

/// Who may do what.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    /// `None` refuses chat-restricted commands everywhere.
    pub allowed_chat_id: Option<i64>,
    /// `None` means nobody can reset.
    pub admin_id: Option<UserId>,
    pub bot_username: Option<String>,
}

impl AccessPolicy {
    pub fn chat_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chat_id == Some(chat_id)
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_id == Some(user_id)
    }
}

impl From<&BotConfig> for AccessPolicy {
    fn from(config: &BotConfig) -> Self {
        Self {
            allowed_chat_id: config.allowed_chat_id,
            admin_id: config.admin_id,
            bot_username: config.bot_username.clone(),
        }
    }
}

pub struct Router<S, C> {
    garden: Garden<S, C>,
    access: AccessPolicy,
}

impl<S: RecordStore, C: Chance> Router<S, C> {
    pub fn new(garden: Garden<S, C>, access: AccessPolicy) -> Self {
        Self { garden, access }
    }

    pub fn garden(&self) -> &Garden<S, C> {
        &self.garden
    }

    /// Handle one message. `None` means stay silent.
    pub fn handle(&self, message: &InboundMessage) -> Option<Reply> {
        let command = parse_command(&message.text, self.access.bot_username.as_deref())?;
        let chat_id = message.chat_id;

        match command {
            Ok(Command::Add(amount)) => self.add(message, amount),
            Err(err) => {
                if !self.access.chat_allowed(chat_id) {
                    return Some(self.deny(message, "add", messages::CHAT_DENIED));
                }
                if !self.garden.admit(message.message_id) {
                    return None;
                }
                warn!(user_id = message.user_id, text = %message.text, error = %err, "invalid /add");
                Some(Reply::text(chat_id, validation_reply(&err)))
            }
            Ok(Command::Start) => self.admitted(message, || messages::WELCOME.to_string()),
            Ok(Command::Help) => self.admitted(message, || messages::HELP.to_string()),
            Ok(Command::Top) => self.admitted(message, || match self.garden.leaderboard(None) {
                Ok(rows) => messages::leaderboard(&rows),
                Err(_) => messages::TOP_ERROR.to_string(),
            }),
            Ok(Command::Export) => self.export(message),
            Ok(Command::Backup) => self.backup(message),
            Ok(Command::Reset) => self.reset(message),
        }
    }

    fn add(&self, message: &InboundMessage, amount: u64) -> Option<Reply> {
        let chat_id = message.chat_id;
        if !self.access.chat_allowed(chat_id) {
            return Some(self.deny(message, "add", messages::CHAT_DENIED));
        }

        let request = IncrementRequest {
            user_id: message.user_id,
            display_name: display_name(message),
            amount,
            request_id: message.message_id,
        };
        match self.garden.increment(&request) {
            Ok(IncrementOutcome::Applied(summary)) => Some(Reply::text(chat_id, messages::add_success(&summary))),
            Ok(IncrementOutcome::Duplicate) => None,
            Err(EngineError::Validation(err)) => Some(Reply::text(chat_id, validation_reply(&err))),
            Err(err) => {
                let text = match self.admin_detail(message, &err) {
                    Some(detail) => format!("{}\nError: {detail}", messages::ADD_ERROR),
                    None => messages::ADD_ERROR.to_string(),
                };
                Some(Reply::text(chat_id, text))
            }
        }
    }

    fn export(&self, message: &InboundMessage) -> Option<Reply> {
        if !self.access.chat_allowed(message.chat_id) {
            return Some(self.deny(message, "export", messages::BACKUP_DENIED));
        }
        if !self.garden.admit(message.message_id) {
            return None;
        }
        Some(match self.garden.full_export() {
            Ok(table) => document(message.chat_id, EXPORT_FILENAME, to_csv(&table)),
            Err(err) => {
                error!(chat_id = message.chat_id, error = %err, "export failed");
                Reply::text(message.chat_id, messages::backup_error(self.admin_detail(message, &err).as_deref()))
            }
        })
    }

    fn backup(&self, message: &InboundMessage) -> Option<Reply> {
        if !self.access.chat_allowed(message.chat_id) {
            return Some(self.deny(message, "backup", messages::BACKUP_DENIED));
        }
        if !self.garden.admit(message.message_id) {
            return None;
        }
        Some(match self.garden.backup() {
            Ok(table) => {
                info!(chat_id = message.chat_id, rows = table.rows.len(), "backup sent");
                document(message.chat_id, BACKUP_FILENAME, to_csv(&table))
            }
            Err(err) => Reply::text(message.chat_id, messages::backup_error(self.admin_detail(message, &err).as_deref())),
        })
    }

    fn reset(&self, message: &InboundMessage) -> Option<Reply> {
        if !self.garden.admit(message.message_id) {
            return None;
        }
        if !self.access.is_admin(message.user_id) {
            return Some(self.deny(message, "reset", messages::RESET_DENIED));
        }
        Some(match self.garden.reset_all() {
            Ok(summary) => {
                info!(admin_id = message.user_id, "progress reset by admin");
                Reply::text(message.chat_id, messages::reset_done(&summary))
            }
            Err(err) => {
                error!(admin_id = message.user_id, error = %err, "reset failed");
                Reply::text(message.chat_id, messages::reset_error(Some(&err.to_string())))
            }
        })
    }

    fn admitted(&self, message: &InboundMessage, text: impl FnOnce() -> String) -> Option<Reply> {
        if !self.garden.admit(message.message_id) {
            return None;
        }
        Some(Reply::text(message.chat_id, text()))
    }

    fn deny(&self, message: &InboundMessage, command: &str, text: &str) -> Reply {
        warn!(
            user_id = message.user_id,
            chat_id = message.chat_id,
            command,
            "command refused"
        );
        Reply::text(message.chat_id, text)
    }

    fn admin_detail(&self, message: &InboundMessage, err: &dyn std::error::Error) -> Option<String> {
        self.access
            .is_admin(message.user_id)
            .then(|| err.to_string())
    }
}

fn display_name(message: &InboundMessage) -> String {
    message
        .first_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DISPLAY_NAME)
        .to_string()
}

fn validation_reply(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::NonPositiveAmount => messages::ADD_ZERO,
        _ => messages::ADD_PROMPT,
    }
}

fn document(chat_id: i64, filename: &str, content: String) -> Reply {
    Reply::Document {
        chat_id,
        filename: filename.to_string(),
        content,
    }
}
