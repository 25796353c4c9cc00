//! Source code for a Telegram bot that hands out deep links to URLs.
//!
//! The admin sends the bot a URL and gets back a `https://t.me/<bot>?start=<id>`
//! link. Anyone opening that link gets the original URL back, and the click is counted.

/// Configuration resolved once at startup.
pub mod config;

/// The database.
pub mod database;

/// Minting of link identifiers.
pub mod identifier;

/// Turning inbound events into database operations and responses.
pub mod dispatch;

/// Command table of the bot.
mod commands;

/// Functions that handle events from Telegram.
mod handlers;

/// Entry function that starts the bot.
mod entry;
pub use entry::*;
