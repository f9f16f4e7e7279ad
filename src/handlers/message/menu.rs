use teloxide::prelude::*;

use crate::error::HandlerResult;
use crate::handlers::{screens, RequestContext};
use crate::services::dialogue::{BotDialogue, DialogueState};
use crate::state::AppState;
use crate::utils::keyboard;

use super::registration;

/// Idle-state text dispatch: menu buttons first, then registration
/// continuation for users whose cursor has not reached COMPLETED.
pub async fn handle_text(bot: Bot, dialogue: BotDialogue, msg: Message, ctx: RequestContext) -> HandlerResult {
    let Some(input) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    match input {
        keyboard::BTN_BACK_TO_MENU => {
            dialogue.update(DialogueState::Idle).await?;
            screens::show_main_menu(&bot, chat_id, ctx.is_admin, "Выберите действие:").await
        }
        keyboard::BTN_BACK_TO_APPOINTMENT => screens::show_confirmation(&bot, &dialogue, chat_id).await,
        keyboard::BTN_APPOINTMENT => screens::show_confirmation(&bot, &dialogue, chat_id).await,
        keyboard::BTN_PROFILE => screens::show_profile(&bot, chat_id).await,
        keyboard::BTN_PROMOTIONS => screens::show_promotions(&bot, chat_id, ctx.is_admin).await,
        keyboard::BTN_CLINIC_INFO => screens::show_clinic_info(&bot, chat_id, ctx.is_admin).await,
        keyboard::BTN_REVIEWS => screens::show_reviews(&bot, chat_id, ctx.is_admin).await,
        keyboard::BTN_REFERRAL => screens::show_referral(&bot, chat_id, ctx.is_admin).await,
        keyboard::BTN_TEETH_ANALYSIS => {
            dialogue.update(DialogueState::AwaitingTeethPhoto).await?;
            bot.send_message(chat_id, "Пожалуйста, отправьте фотографию ваших зубов для анализа.")
                .reply_markup(keyboard::back_to_menu())
                .await?;
            Ok(())
        }
        keyboard::BTN_ADMIN_PANEL if ctx.is_admin => screens::show_admin_panel(&bot, chat_id).await,
        keyboard::BTN_STATISTICS if ctx.is_admin => screens::show_detailed_statistics(&bot, chat_id).await,
        keyboard::BTN_REQUESTS if ctx.is_admin => screens::show_pending_requests(&bot, chat_id).await,
        keyboard::BTN_REQUEST_HISTORY if ctx.is_admin => screens::show_request_history(&bot, chat_id).await,
        keyboard::BTN_ADMIN_PROMOTIONS if ctx.is_admin => {
            dialogue.update(DialogueState::AddingPromotion).await?;
            bot.send_message(chat_id, "Введите текст новой акции:")
                .reply_markup(keyboard::cancel())
                .await?;
            Ok(())
        }
        keyboard::BTN_BONUS_ADD if ctx.is_admin => {
            start_bonus_flow(&bot, &dialogue, chat_id, crate::services::bonus::BonusKind::Add).await
        }
        keyboard::BTN_BONUS_SUBTRACT if ctx.is_admin => {
            start_bonus_flow(&bot, &dialogue, chat_id, crate::services::bonus::BonusKind::Subtract).await
        }
        other => {
            let state = AppState::get()?;
            match state.profiles.get(ctx.identity()).await? {
                None => registration::start(&bot, &msg, &ctx, "").await,
                Some(user) if !user.is_completed() => {
                    registration::handle_step(&bot, &msg, &ctx, &user, other).await
                }
                Some(_) => Ok(()),
            }
        }
    }
}

async fn start_bonus_flow(
    bot: &Bot,
    dialogue: &BotDialogue,
    chat_id: ChatId,
    kind: crate::services::bonus::BonusKind,
) -> HandlerResult {
    dialogue.update(DialogueState::AwaitingBonusPhone { kind }).await?;
    bot.send_message(chat_id, "Введите номер телефона пользователя в формате +7XXXXXXXXXX:")
        .reply_markup(keyboard::cancel())
        .await?;
    Ok(())
}
