use std::{fs, path::PathBuf};

use teloxide::types::UserId;

/// Key file read when `BOT_TOKEN` is not set.
const KEY_FILE: &str = match cfg!(debug_assertions) {
    true => "key_debug",
    false => "key",
};
const DEFAULT_DB_PATH: &str = "url_shortener.db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BOT_TOKEN is not set, and there is no bot key file either")]
    MissingToken,
    #[error("ADMIN_ID must be a numeric Telegram user ID, got {0:?}")]
    InvalidAdminId(String),
}

/// Everything the bot needs to know before it can start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token.
    pub bot_token: String,
    /// The only user allowed to create links and see statistics.
    pub admin_id: UserId,
    /// Location of the SQLite database file.
    pub db_path: PathBuf,
}

impl Config {
    /// Reads the configuration from the environment, loading a `.env` file first if there is one.
    ///
    /// # Errors
    ///
    /// Errors if there's no bot token anywhere, or if `ADMIN_ID` is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Failed to load .env file: {e}");
            }
        }

        let key_file = fs::read_to_string(KEY_FILE).ok();
        Self::from_lookup(|name| std::env::var(name).ok(), key_file)
    }

    fn from_lookup(
        var: impl Fn(&str) -> Option<String>,
        key_file: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bot_token = var("BOT_TOKEN")
            .or(key_file)
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        // No admin means nobody can create links. Not an error, the bot still resolves them.
        let admin_id = match var("ADMIN_ID") {
            Some(id) => id
                .trim()
                .parse()
                .map(UserId)
                .map_err(|_| ConfigError::InvalidAdminId(id))?,
            None => UserId(0),
        };

        let db_path = var("DB_PATH")
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
            .into();

        Ok(Config {
            bot_token,
            admin_id,
            db_path,
        })
    }
}
