use std::sync::Arc;
use teloxide::{dptree::deps, error_handlers::LoggingErrorHandler, prelude::*, types::UserId};

use crate::{
    commands::Command,
    config::Config,
    database::Database,
    dispatch::LinkDispatcher,
    handlers::{handle_callback_query, handle_message},
};

/// # Panics
///
/// Panics if there's no bot token, or if the bot fails to start lol
pub async fn entry() {
    log::info!("Starting the deep link bot...");
    let config = Config::from_env().expect("Could not load the configuration!");

    if config.admin_id == UserId(0) {
        log::warn!("ADMIN_ID is not set. Nobody will be able to create links.");
    }

    let bot = Bot::new(&config.bot_token);

    bot.set_my_commands(Command::generate_bot_commands())
        .await
        .expect("Failed to set bot commands!");

    let me = bot.get_me().await.expect("Failed to get info about the bot!");

    let database = Arc::new(
        Database::new(&config.db_path)
            .await
            .expect("Could not init the database!"),
    );

    let dispatcher = Arc::new(LinkDispatcher::new(database, &config, me.username()));

    log::info!("Creating the handler...");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback_query));

    log::info!("Dispatching the dispatcher as @{}!", me.username());

    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred while handling an update",
        ))
        .dependencies(deps![dispatcher])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("it appears we have been bonked.");
}
