use teloxide::{macros::BotCommands, prelude::Requester, types::BotCommand, Bot};

use crate::error::BotResult;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Starts the bot; may carry a referral deep-link payload (`ref<id>`).
    Start(String),
}

impl Command {
    pub fn user_commands() -> Vec<BotCommand> {
        vec![BotCommand::new("start", "Запустить бота")]
    }
}

pub async fn setup_commands(bot: &Bot) -> BotResult<()> {
    bot.set_my_commands(Command::user_commands()).await?;
    Ok(())
}
