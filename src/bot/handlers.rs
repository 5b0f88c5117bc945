use crate::agent::{Orchestrator, OrchestratorError, ReplySink};
use crate::bot::messaging::TelegramReplySink;
use anyhow::Result;
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{ForceReply, ParseMode},
    utils::command::BotCommands,
};
use tracing::{debug, error, info};

/// Reply to the `/help` command
pub const HELP_TEXT: &str = "Help!";

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Greet the user
    #[command(description = "Start the bot.")]
    Start,
    /// Show help text
    #[command(description = "Show help.")]
    Help,
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// HTML link that mentions a user by id
///
/// # Examples
///
/// ```
/// use uihost_bot::bot::handlers::mention_html;
/// assert_eq!(
///     mention_html(42, "Ann <3"),
///     "<a href=\"tg://user?id=42\">Ann &lt;3</a>"
/// );
/// ```
#[must_use]
pub fn mention_html(user_id: u64, full_name: &str) -> String {
    format!(
        "<a href=\"tg://user?id={user_id}\">{}</a>",
        html_escape::encode_text(full_name)
    )
}

/// Returns true for text the orchestrator must not see
#[must_use]
pub fn is_command(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

/// Start handler: greet the user and ask for a reply
///
/// # Errors
///
/// Returns an error if the greeting cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    let greeting = msg.from.as_ref().map_or_else(
        || "Hi!".to_string(),
        |user| format!("Hi {}!", mention_html(user.id.0, &user.full_name())),
    );

    info!(user_id = get_user_id_safe(&msg), "User initiated /start command.");

    bot.send_message(msg.chat.id, greeting)
        .parse_mode(ParseMode::Html)
        .reply_markup(ForceReply {
            selective: true,
            ..ForceReply::new()
        })
        .await?;
    Ok(())
}

/// Help handler
///
/// # Errors
///
/// Returns an error if the help text cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, HELP_TEXT).await?;
    Ok(())
}

/// Run one text message through the orchestrator.
///
/// Orchestration errors are logged and, when the user can still be reached,
/// answered with a short notice.
///
/// # Errors
///
/// Returns an error only if the failure notice itself cannot be sent.
pub async fn handle_text(bot: Bot, msg: Message, orchestrator: Arc<Orchestrator>) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user_id = get_user_id_safe(&msg);

    if is_command(text) {
        debug!(user_id, "Ignoring unknown command");
        return Ok(());
    }

    info!(user_id, chat_id = %msg.chat.id, "Received message");

    let sink = TelegramReplySink::new(bot, msg.chat.id, msg.id);
    match orchestrator.process(text, &sink).await {
        Ok(completion) => {
            debug!(user_id, ?completion, "Message processed");
        }
        Err(e) => {
            error!(user_id, error = %e, "Failed to process message");
            notify_failure(&e, &sink).await?;
        }
    }

    Ok(())
}

/// Tell the user that processing failed, unless the failure was the reply channel itself.
///
/// # Errors
///
/// Returns an error if the notice cannot be delivered.
pub async fn notify_failure(error: &OrchestratorError, sink: &dyn ReplySink) -> Result<()> {
    match error.user_notice() {
        Some(notice) => sink.reply(notice).await,
        None => {
            debug!(error = %error, "No failure notice for this error");
            Ok(())
        }
    }
}
