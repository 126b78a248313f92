//! Chat-facing layer: command parsing, access control and reply text.

pub mod command;
pub mod messages;
pub mod router;

pub use command::{parse_command, Command};
pub use router::{AccessPolicy, InboundMessage, Reply, Router};
