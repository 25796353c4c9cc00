//! The part of the bot that doesn't care about Telegram's API. It gets [`Event`]s, does the
//! database work they call for, and says what to answer with a [`Response`].

use std::sync::Arc;

use html_escape::encode_text;
use teloxide::types::UserId;
use url::Url;

use crate::{
    commands::{Command, CommandKind},
    config::Config,
    database::{Database, LinkStats, StoreError},
    identifier::generate_unique_id,
};

/// How many fresh identifiers to try if the generated one is already taken.
const MAX_CREATE_ATTEMPTS: usize = 3;
/// How much of a URL is shown in the stats list.
const STATS_URL_PREFIX_CHARS: usize = 50;
/// Longest URL accepted, counted after HTML escaping. Leaves room for the rest of the reply
/// within Telegram's 4096 character message limit.
const MAX_ESCAPED_URL_CHARS: usize = 3000;
/// Prefix of callback data of the "copy link" button. The identifier follows it.
const COPY_CALLBACK_PREFIX: &str = "copy_";

/// Whoever sent an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl Sender {
    /// Readable name of the sender, stored alongside the links they make.
    #[must_use]
    pub fn label(&self) -> String {
        bot_commons::name_prettyprint(
            &self.first_name,
            self.last_name.as_deref(),
            self.username.as_deref(),
        )
    }
}

/// Something that happened and that the bot may want to respond to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `/start <id>`, which is what opening a deep link sends.
    StartWithArg(String),
    /// `/start` on its own.
    StartNoArg,
    Help,
    Stats,
    /// Any text that is not a command.
    TextMessage(String),
    /// A press of an inline keyboard button, with its data.
    Callback(String),
}

impl Event {
    /// Figure out what this message text means.
    ///
    /// Returns [`None`] for commands this bot doesn't know, and for commands addressed to
    /// another bot, like `/start@Some_Other_Bot`.
    #[must_use]
    pub fn parse(text: &str, bot_username: &str) -> Option<Event> {
        if !text.starts_with('/') {
            return Some(Event::TextMessage(text.to_string()));
        }

        let command = text.split_whitespace().next()?;
        let params = text[command.len()..].trim_start();

        // If the command is "/start@Deep_Link_Bot",
        // trim the "@" and everything after it.
        let callname = if let Some(username_start) = command.find('@') {
            // Bot names are guaranteed ASCII, so ignore ASCII case specifically.
            if !command[username_start + '@'.len_utf8()..].eq_ignore_ascii_case(bot_username) {
                // This command is not for us. Ignore.
                return None;
            }
            &command[..username_start]
        } else {
            command
        };

        let event = match Command::find(callname)?.kind {
            CommandKind::Start => match params.split_whitespace().next() {
                Some(arg) => Event::StartWithArg(arg.to_string()),
                None => Event::StartNoArg,
            },
            CommandKind::Help => Event::Help,
            CommandKind::Stats => Event::Stats,
        };

        Some(event)
    }
}

/// A button attached to a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Affordance {
    /// Opens this URL.
    Link { label: String, url: Url },
    /// Sends this data back as [`Event::Callback`].
    Callback { label: String, data: String },
}

/// What to answer with. Text is in Telegram's HTML format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub affordances: Vec<Affordance>,
}

impl Response {
    fn text(text: impl Into<String>) -> Response {
        Response {
            text: text.into(),
            affordances: Vec::new(),
        }
    }
}

/// Canned responses.
mod responses {
    pub const EXPIRED: &str = "❌ This link is no longer valid or has expired.";
    pub const ADMIN_ONLY_COMMAND: &str = "🚫 <b>Admin only command.</b>";
    pub const ADMIN_ONLY_LINKS: &str = "🚫 <b>Only the admin can generate links.</b>";
    pub const NOT_A_URL: &str = "❌ Please send a valid URL starting with http:// or https://";
    pub const URL_TOO_LONG: &str = "❌ This URL is too long. Please send a shorter one.";
    pub const STORAGE_FAILURE: &str =
        "⚠️ Something went wrong on our side. Please try again later.";
    pub const NO_UNIQUE_ID: &str =
        "❌ Failed to generate a unique link for this URL. Please send it again.";
}

pub struct LinkDispatcher {
    database: Arc<Database>,
    admin_id: UserId,
    bot_username: String,
    generate_id: fn(&str) -> String,
}

impl LinkDispatcher {
    pub fn new(database: Arc<Database>, config: &Config, bot_username: impl Into<String>) -> Self {
        LinkDispatcher {
            database,
            admin_id: config.admin_id,
            bot_username: bot_username.into(),
            generate_id: generate_unique_id,
        }
    }

    #[must_use]
    pub fn bot_username(&self) -> &str {
        &self.bot_username
    }

    #[must_use]
    pub fn is_admin(&self, sender: &Sender) -> bool {
        sender.id == self.admin_id
    }

    /// The `https://t.me/<bot>?start=<id>` link for this identifier.
    #[must_use]
    pub fn deep_link(&self, id: &str) -> String {
        format!("https://t.me/{}?start={}", self.bot_username, id)
    }

    /// Handle an event from this sender.
    ///
    /// Returns [`None`] if there's nothing to say.
    pub async fn handle(&self, sender: &Sender, event: Event) -> Option<Response> {
        let response = match event {
            Event::StartWithArg(id) => self.resolve(sender, &id).await,
            Event::StartNoArg => welcome(sender),
            Event::Help => help(),
            Event::Stats => self.stats(sender).await,
            Event::TextMessage(body) => self.submit(sender, &body).await,
            Event::Callback(data) => return self.callback(&data),
        };
        Some(response)
    }

    async fn resolve(&self, sender: &Sender, id: &str) -> Response {
        match self.database.lookup(id).await {
            Ok(Some(url)) => {
                log::info!("User {} accessed URL via deep link: {}", sender.id, url);

                let affordances = Url::parse(&url)
                    .map(|url| Affordance::Link {
                        label: "🌐 Open URL".to_string(),
                        url,
                    })
                    .into_iter()
                    .collect();

                Response {
                    text: format!("🔗 Here's your requested link:\n\n{}", encode_text(&url)),
                    affordances,
                }
            }
            Ok(None) => Response::text(responses::EXPIRED),
            Err(e) => storage_failure(&e),
        }
    }

    async fn stats(&self, sender: &Sender) -> Response {
        if !self.is_admin(sender) {
            log::info!("Refused stats to non-admin user {}", sender.id);
            return Response::text(responses::ADMIN_ONLY_COMMAND);
        }

        match self.database.stats().await {
            Ok(stats) => Response::text(render_stats(&stats)),
            Err(e) => storage_failure(&e),
        }
    }

    async fn submit(&self, sender: &Sender, body: &str) -> Response {
        if !self.is_admin(sender) {
            log::info!("Refused link generation to non-admin user {}", sender.id);
            return Response::text(responses::ADMIN_ONLY_LINKS);
        }

        if !body.starts_with("http://") && !body.starts_with("https://") {
            return Response::text(responses::NOT_A_URL);
        }

        // Replies quote the URL in full, and Telegram won't send anything too long.
        if encode_text(body).chars().count() > MAX_ESCAPED_URL_CHARS {
            return Response::text(responses::URL_TOO_LONG);
        }

        let label = sender.label();

        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let id = (self.generate_id)(body);
            match self.database.create(&id, body, sender.id, &label).await {
                Ok(()) => {
                    let response = self.created(body, &id);
                    log::info!(
                        "Admin {} generated deep link for URL: {} -> {}",
                        sender.id,
                        body,
                        self.deep_link(&id)
                    );
                    return response;
                }
                Err(StoreError::DuplicateIdentifier(id)) => {
                    log::warn!("Duplicate unique_id {id} (attempt {attempt}), regenerating");
                }
                Err(e) => return storage_failure(&e),
            }
        }

        log::error!("Gave up generating a unique identifier for URL: {body}");
        Response::text(responses::NO_UNIQUE_ID)
    }

    fn created(&self, url: &str, id: &str) -> Response {
        let deep_link = self.deep_link(id);

        let mut affordances = Vec::with_capacity(3);
        if let Ok(url) = Url::parse(url) {
            affordances.push(Affordance::Link {
                label: "🔗 Open URL".to_string(),
                url,
            });
        }
        if let Ok(share) = Url::parse_with_params("https://t.me/share/url", [("url", &deep_link)])
        {
            affordances.push(Affordance::Link {
                label: "📤 Share Link".to_string(),
                url: share,
            });
        }
        affordances.push(Affordance::Callback {
            label: "📋 Copy Link".to_string(),
            data: format!("{COPY_CALLBACK_PREFIX}{id}"),
        });

        Response {
            text: format!(
                concat!(
                    "✅ <b>Telegram Deep Link Generated</b>\n\n",
                    "🔗 <b>Your URL:</b>\n<code>{}</code>\n\n",
                    "➡️ <b>Telegram Deep Link:</b>\n<code>{}</code>\n\n",
                    "📤 <b>Share this link with your users!</b>"
                ),
                encode_text(url),
                encode_text(&deep_link),
            ),
            affordances,
        }
    }

    fn callback(&self, data: &str) -> Option<Response> {
        let id = data.strip_prefix(COPY_CALLBACK_PREFIX)?;
        Some(Response::text(format!(
            concat!(
                "📋 <b>Link Copied</b>\n\n",
                "🔗 <b>Link:</b>\n<code>{}</code>\n\n",
                "📤 You can now paste this link anywhere!"
            ),
            encode_text(&self.deep_link(id)),
        )))
    }
}

fn welcome(sender: &Sender) -> Response {
    Response::text(format!(
        concat!(
            "👋 Hello {}!\n\n",
            "I'm a URL sharing bot. ",
            "Only the admin can generate shareable Telegram links.\n\n",
            "🔗 <b>How to use:</b>\n",
            "1. Click on a link shared by the admin\n",
            "2. You'll be directed to the URL\n\n",
            "Contact the admin if you need to share a URL."
        ),
        encode_text(&sender.first_name),
    ))
}

fn help() -> Response {
    Response::text(format!(
        concat!(
            "🤖 <b>URL Sharing Bot Help</b>\n\n",
            "I generate Telegram deep links for URLs.\n\n",
            "🔗 <b>How to use:</b>\n",
            "• Only the admin can generate links\n",
            "• Click on links shared by the admin\n",
            "• You'll be directed to the URL\n\n",
            "📋 <b>Supported URLs:</b>\n",
            "• Website links\n",
            "• YouTube videos\n",
            "• Social media posts\n",
            "• Any valid URL\n\n",
            "🛠 <b>Commands:</b>\n",
            "{}"
        ),
        Command::generate_help_lines(),
    ))
}

fn render_stats(stats: &LinkStats) -> String {
    use std::fmt::Write;

    let mut text = format!(
        concat!(
            "📊 <b>URL Statistics</b>\n\n",
            "• Total URLs shortened: {}\n",
            "• Total clicks: {}\n\n",
            "🔝 <b>Top 5 Most Clicked URLs:</b>\n"
        ),
        stats.total_records, stats.total_clicks,
    );

    for (i, link) in stats.top.iter().enumerate() {
        let url = &link.destination_url;
        let shown = match url.char_indices().nth(STATS_URL_PREFIX_CHARS) {
            Some((cut, _)) => format!("{}...", &url[..cut]),
            None => url.clone(),
        };
        writeln!(
            text,
            "{}. {} clicks - {}",
            i + 1,
            link.click_count,
            encode_text(&shown)
        )
        .expect("Writing to a String never fails");
    }

    text
}

fn storage_failure(e: &StoreError) -> Response {
    log::error!("Database failed while handling an event: {e}");
    Response::text(responses::STORAGE_FAILURE)
}
