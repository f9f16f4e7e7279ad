use teloxide::net::Download;
use teloxide::prelude::*;

use crate::error::HandlerResult;
use crate::handlers::{screens, RequestContext};
use crate::services::dialogue::{BotDialogue, DialogueState};
use crate::state::AppState;
use crate::utils::keyboard;

/// One photo in, one analysis out. The dialogue always returns to `Idle`
/// after an attempt, successful or not.
pub async fn handle_teeth_photo(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    ctx: RequestContext,
) -> HandlerResult {
    let chat_id = msg.chat.id;

    if let Some(text) = msg.text() {
        if text == keyboard::BTN_BACK_TO_MENU || text == keyboard::BTN_CANCEL {
            dialogue.update(DialogueState::Idle).await?;
            return screens::show_main_menu(&bot, chat_id, ctx.is_admin, "Выберите действие:").await;
        }
        bot.send_message(chat_id, "Пожалуйста, отправьте фотографию ваших зубов.")
            .reply_markup(keyboard::back_to_menu())
            .await?;
        return Ok(());
    }

    let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) else {
        bot.send_message(chat_id, "Пожалуйста, отправьте фотографию ваших зубов.")
            .reply_markup(keyboard::back_to_menu())
            .await?;
        return Ok(());
    };

    bot.send_message(chat_id, "🔍 Анализирую фотографию ваших зубов...").await?;

    let file = bot.get_file(photo.file.id.clone()).await?;
    let mut image = Vec::with_capacity(photo.file.size as usize);
    bot.download_file(&file.path, &mut image).await?;

    let state = AppState::get()?;
    match state.vision.analyze(&image).await {
        Ok(analysis) => {
            bot.send_message(chat_id, analysis)
                .reply_markup(keyboard::main_menu(ctx.is_admin))
                .await?;
        }
        Err(e) => {
            error!("Teeth photo analysis failed for {}: {}", ctx.identity(), e);
            bot.send_message(
                chat_id,
                "Извините, произошла ошибка при анализе фотографии. \
                 Пожалуйста, попробуйте позже или обратитесь к администратору.",
            )
            .reply_markup(keyboard::main_menu(ctx.is_admin))
            .await?;
        }
    }

    dialogue.update(DialogueState::Idle).await?;
    Ok(())
}
