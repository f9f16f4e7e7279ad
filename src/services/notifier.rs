use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, ParseMode};

use crate::error::BotResult;

/// Outbound message fan-out. Delivery is attempted independently per
/// recipient: a blocked bot or a dead chat is logged and skipped, and never
/// aborts the rest of the set or rolls back the triggering operation.
#[derive(Clone)]
pub struct Notifier {
    bot: Bot,
}

impl Notifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send(&self, recipient: i64, text: &str) -> BotResult<()> {
        self.bot.send_message(ChatId(recipient), text).await?;
        Ok(())
    }

    pub async fn send_html(&self, recipient: i64, text: &str) -> BotResult<()> {
        self.bot
            .send_message(ChatId(recipient), text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    pub async fn send_with_markup(&self, recipient: i64, text: &str, markup: InlineKeyboardMarkup) -> BotResult<()> {
        self.bot
            .send_message(ChatId(recipient), text)
            .parse_mode(ParseMode::Html)
            .reply_markup(markup)
            .await?;
        Ok(())
    }

    /// Sends `text` to every recipient, returning the ids that were actually
    /// reached.
    pub async fn fan_out(&self, recipients: &[i64], text: &str) -> Vec<i64> {
        let mut delivered = Vec::with_capacity(recipients.len());
        for &recipient in recipients {
            match self.send_html(recipient, text).await {
                Ok(()) => delivered.push(recipient),
                Err(e) => warn!("Failed to deliver to {}: {}", recipient, e),
            }
        }
        delivered
    }

    /// Same as `fan_out` but with an inline keyboard attached to each message.
    pub async fn fan_out_with_markup(&self, recipients: &[i64], text: &str, markup: InlineKeyboardMarkup) -> Vec<i64> {
        let mut delivered = Vec::with_capacity(recipients.len());
        for &recipient in recipients {
            match self.send_with_markup(recipient, text, markup.clone()).await {
                Ok(()) => delivered.push(recipient),
                Err(e) => warn!("Failed to deliver to {}: {}", recipient, e),
            }
        }
        delivered
    }
}
