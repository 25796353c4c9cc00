use std::sync::Arc;

use bot_commons::user_name_prettyprint;
use teloxide::{
    payloads::{EditMessageTextSetters, SendMessageSetters},
    requests::Requester,
    types::{
        CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, ParseMode, User,
    },
    Bot, RequestError,
};

use crate::dispatch::{Affordance, Event, LinkDispatcher, Sender};

impl From<&User> for Sender {
    fn from(user: &User) -> Self {
        Sender {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
        }
    }
}

/// Lay out buttons two per row. Returns [`None`] if there are no buttons.
fn make_keyboard(affordances: &[Affordance]) -> Option<InlineKeyboardMarkup> {
    if affordances.is_empty() {
        return None;
    }

    let buttons: Vec<InlineKeyboardButton> = affordances
        .iter()
        .map(|affordance| match affordance {
            Affordance::Link { label, url } => InlineKeyboardButton::url(label, url.clone()),
            Affordance::Callback { label, data } => InlineKeyboardButton::callback(label, data),
        })
        .collect();

    Some(InlineKeyboardMarkup::new(
        buttons.chunks(2).map(<[InlineKeyboardButton]>::to_vec),
    ))
}

pub async fn handle_message(
    bot: Bot,
    message: Message,
    dispatcher: Arc<LinkDispatcher>,
) -> Result<(), RequestError> {
    // Channel posts and such. Links are only handed out to people.
    let Some(user) = &message.from else {
        return Ok(());
    };
    if user.is_bot {
        return Ok(());
    }

    let Some(text) = message.text() else {
        return Ok(());
    };

    let Some(event) = Event::parse(text, dispatcher.bot_username()) else {
        return Ok(());
    };

    log::debug!(
        "Got {:?} from {}",
        event,
        user_name_prettyprint(user, true)
    );

    let Some(response) = dispatcher.handle(&Sender::from(user), event).await else {
        return Ok(());
    };

    let mut request = bot
        .send_message(message.chat.id, response.text)
        .parse_mode(ParseMode::Html);
    if let Some(keyboard) = make_keyboard(&response.affordances) {
        request = request.reply_markup(keyboard);
    }
    request.await?;

    Ok(())
}

pub async fn handle_callback_query(
    bot: Bot,
    query: CallbackQuery,
    dispatcher: Arc<LinkDispatcher>,
) -> Result<(), RequestError> {
    // Always answer, or the button keeps spinning on the user's side.
    bot.answer_callback_query(query.id.clone()).await?;

    let Some(data) = query.data else {
        return Ok(());
    };

    log::debug!(
        "Got callback {:?} from {}",
        data,
        user_name_prettyprint(&query.from, true)
    );

    let Some(response) = dispatcher
        .handle(&Sender::from(&query.from), Event::Callback(data))
        .await
    else {
        return Ok(());
    };

    let Some(message) = &query.message else {
        // May happen if the message is too old
        return Ok(());
    };

    // Editing without a keyboard also removes the old one.
    bot.edit_message_text(message.chat().id, message.id(), response.text)
        .parse_mode(ParseMode::Html)
        .await?;

    Ok(())
}
