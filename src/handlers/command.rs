use teloxide::{dispatching::UpdateHandler, prelude::*};

use crate::command::Command;
use crate::error::HandlerResult;
use crate::services::dialogue::{BotDialogue, DialogueState};

use super::message::registration;
use super::RequestContext;

pub fn get_command_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    Update::filter_message()
        .filter_command::<Command>()
        .branch(dptree::case![Command::Start(payload)].endpoint(handle_start))
}

/// `/start` always returns the chat to a known point: any active flow is
/// abandoned with a notice, then registration or the main menu takes over.
async fn handle_start(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    ctx: RequestContext,
    payload: String,
) -> HandlerResult {
    if !matches!(dialogue.get().await?, None | Some(DialogueState::Idle)) {
        dialogue.update(DialogueState::Idle).await?;
        bot.send_message(msg.chat.id, "Текущее действие отменено.").await?;
    }

    registration::start(&bot, &msg, &ctx, &payload).await
}
