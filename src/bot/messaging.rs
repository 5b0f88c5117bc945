//! Telegram delivery of orchestrator replies.

use crate::agent::ReplySink;
use crate::utils::{retry_telegram_operation, split_long_message};
use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ReplyParameters};
use tracing::debug;

/// Maximum message length for Telegram with safety margin.
/// Telegram's official limit is 4096.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Sends replies as plain-text answers to one incoming message
#[derive(Clone)]
pub struct TelegramReplySink {
    bot: Bot,
    chat_id: ChatId,
    reply_to: MessageId,
}

impl TelegramReplySink {
    /// Create a sink answering `reply_to` in `chat_id`
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId, reply_to: MessageId) -> Self {
        Self {
            bot,
            chat_id,
            reply_to,
        }
    }
}

#[async_trait]
impl ReplySink for TelegramReplySink {
    /// Send `text`, split into several messages if it exceeds the Telegram limit.
    /// Blank text and blank parts are skipped since Telegram rejects empty messages.
    /// If the original message was deleted, parts are sent without the reply link.
    async fn reply(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            debug!(chat_id = %self.chat_id, "Skipping empty reply");
            return Ok(());
        }

        for part in split_long_message(text, TELEGRAM_MESSAGE_LIMIT) {
            retry_telegram_operation(|| {
                let bot = self.bot.clone();
                let part = part.clone();
                let chat_id = self.chat_id;
                let reply_to = self.reply_to;
                async move {
                    bot.send_message(chat_id, part)
                        .reply_parameters(
                            ReplyParameters::new(reply_to).allow_sending_without_reply(),
                        )
                        .await?;
                    Ok(())
                }
            })
            .await?;
        }

        Ok(())
    }
}
