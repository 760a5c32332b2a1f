//! Chat command surface: parsing, routing and the server loop.

pub mod commands;
pub mod router;
pub mod server;

pub use commands::{help_text, parse, Command, CommandSpec, COMMANDS};
pub use router::CommandRouter;
pub use server::BotServer;
