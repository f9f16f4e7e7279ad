use teloxide::prelude::*;
use teloxide::utils::html::escape;

use crate::config::AppConfig;
use crate::error::{BotError, HandlerResult};
use crate::handlers::{screens, RequestContext};
use crate::services::appointment::Decision;
use crate::services::bonus::BonusKind;
use crate::services::dialogue::{BotDialogue, DialogueState};
use crate::services::notifier::Notifier;
use crate::state::AppState;
use crate::utils::{keyboard, validation};

async fn cancel_to_panel(bot: &Bot, dialogue: &BotDialogue, chat_id: ChatId) -> HandlerResult {
    dialogue.update(DialogueState::Idle).await?;
    bot.send_message(chat_id, "Действие отменено.")
        .reply_markup(keyboard::admin_panel())
        .await?;
    Ok(())
}

/// Cancelling mid-approval returns to the pending list, not the panel.
async fn cancel_to_requests(bot: &Bot, dialogue: &BotDialogue, chat_id: ChatId) -> HandlerResult {
    dialogue.update(DialogueState::Idle).await?;
    bot.send_message(chat_id, "Действие отменено.")
        .reply_markup(keyboard::admin_panel())
        .await?;
    screens::show_pending_requests(bot, chat_id).await
}

pub async fn handle_decision_date(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    _ctx: RequestContext,
    request_id: i64,
) -> HandlerResult {
    let Some(input) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    if input == keyboard::BTN_CANCEL {
        return cancel_to_requests(&bot, &dialogue, chat_id).await;
    }
    if !validation::validate_date(input) {
        bot.send_message(chat_id, "Пожалуйста, введите корректную дату в формате ДД.ММ.ГГГГ")
            .await?;
        return Ok(());
    }

    dialogue
        .update(DialogueState::AwaitingDecisionTime {
            request_id,
            date: input.to_string(),
        })
        .await?;
    bot.send_message(chat_id, "Введите время приёма в формате ЧЧ:ММ (например, 14:30):")
        .reply_markup(keyboard::cancel())
        .await?;
    Ok(())
}

pub async fn handle_decision_time(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    ctx: RequestContext,
    (request_id, date): (i64, String),
) -> HandlerResult {
    let Some(input) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    if input == keyboard::BTN_CANCEL {
        return cancel_to_requests(&bot, &dialogue, chat_id).await;
    }
    if !validation::validate_time(input) {
        bot.send_message(chat_id, "Пожалуйста, введите корректное время в формате ЧЧ:ММ")
            .await?;
        return Ok(());
    }

    let state = AppState::get()?;
    let decision = Decision::Approve {
        date: date.clone(),
        time: input.to_string(),
    };
    match state.appointments.decide(ctx.identity(), request_id, decision).await {
        Ok(request) => {
            let notifier = Notifier::new(bot.clone());
            let notice = format!(
                "✅ Ваша заявка одобрена!\n\n📅 Дата приёма: {}\n⏰ Время приёма: {}\n\nЖдем вас в клинике!",
                date, input
            );
            if let Err(e) = notifier.send(request.telegram_id, &notice).await {
                warn!("Failed to notify requester {}: {}", request.telegram_id, e);
            }

            dialogue.update(DialogueState::Idle).await?;
            bot.send_message(chat_id, format!("Заявка #{} одобрена.", request_id))
                .reply_markup(keyboard::admin_panel())
                .await?;
        }
        Err(BotError::RequestAlreadyProcessed(_)) => {
            dialogue.update(DialogueState::Idle).await?;
            bot.send_message(chat_id, "Заявка уже обработана.")
                .reply_markup(keyboard::admin_panel())
                .await?;
        }
        Err(BotError::RequestNotFound(_)) => {
            dialogue.update(DialogueState::Idle).await?;
            bot.send_message(chat_id, "Заявка не найдена.")
                .reply_markup(keyboard::admin_panel())
                .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub async fn handle_comment(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    ctx: RequestContext,
    request_id: i64,
) -> HandlerResult {
    let Some(input) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    if input == keyboard::BTN_BACK_TO_APPOINTMENT {
        dialogue.update(DialogueState::Idle).await?;
        return screens::show_specific_request(&bot, chat_id, request_id).await;
    }

    let state = AppState::get()?;
    match state.appointments.annotate(ctx.identity(), request_id, input).await {
        Ok(request) => {
            let notifier = Notifier::new(bot.clone());
            let notice = format!("Администратор оставил комментарий к вашей заявке:\n\n{}", input);
            if let Err(e) = notifier.send(request.telegram_id, &notice).await {
                warn!("Failed to notify requester {}: {}", request.telegram_id, e);
            }

            dialogue.update(DialogueState::Idle).await?;
            bot.send_message(chat_id, "Комментарий сохранен и отправлен пользователю.")
                .reply_markup(keyboard::admin_panel())
                .await?;
        }
        Err(BotError::RequestNotFound(_)) => {
            dialogue.update(DialogueState::Idle).await?;
            bot.send_message(chat_id, "Заявка не найдена.")
                .reply_markup(keyboard::admin_panel())
                .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Stores the promotion, then fans it out to recently active registered
/// users. The stored promotion stays even when every delivery fails.
pub async fn handle_promotion_text(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    _ctx: RequestContext,
) -> HandlerResult {
    let Some(input) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    if input == keyboard::BTN_CANCEL {
        return cancel_to_panel(&bot, &dialogue, chat_id).await;
    }

    let state = AppState::get()?;
    let config = AppConfig::get()?;

    let promotion_id = state.promotions.create(input).await?;
    let recipients = state
        .profiles
        .active_completed(config.broadcast.active_window_days)
        .await?;

    let notifier = Notifier::new(bot.clone());
    let broadcast = format!("<b>🎉 Новая акция!</b>\n\n{}", escape(input));
    let delivered = notifier.fan_out(&recipients, &broadcast).await;
    info!(
        "Promotion {} broadcast: {}/{} delivered",
        promotion_id,
        delivered.len(),
        recipients.len()
    );
    for recipient in &delivered {
        state.promotions.record_view(promotion_id, *recipient).await?;
    }

    dialogue.update(DialogueState::Idle).await?;
    bot.send_message(chat_id, "Новая акция успешно добавлена и разослана пользователям!")
        .reply_markup(keyboard::admin_panel())
        .await?;
    Ok(())
}

pub async fn handle_bonus_phone(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    _ctx: RequestContext,
    kind: BonusKind,
) -> HandlerResult {
    let Some(input) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    if input == keyboard::BTN_CANCEL {
        return cancel_to_panel(&bot, &dialogue, chat_id).await;
    }

    let state = AppState::get()?;
    let Some(user) = state.profiles.find_by_phone(input.trim()).await? else {
        bot.send_message(chat_id, "Пользователь с таким номером телефона не найден.")
            .await?;
        return Ok(());
    };

    let full_name = user.full_name.clone().unwrap_or_else(|| "Не указано".to_string());
    dialogue
        .update(DialogueState::AwaitingBonusAmount {
            kind,
            target: user.telegram_id,
            full_name: full_name.clone(),
        })
        .await?;

    let action = match kind {
        BonusKind::Add => "начисления",
        BonusKind::Subtract => "списания",
    };
    bot.send_message(
        chat_id,
        format!(
            "Пользователь: {}\nТекущий баланс: {}\n\nВведите количество бонусов для {}:",
            full_name, user.bonuses, action
        ),
    )
    .reply_markup(keyboard::cancel())
    .await?;
    Ok(())
}

pub async fn handle_bonus_amount(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    ctx: RequestContext,
    (kind, target, full_name): (BonusKind, i64, String),
) -> HandlerResult {
    let Some(input) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    if input == keyboard::BTN_CANCEL {
        return cancel_to_panel(&bot, &dialogue, chat_id).await;
    }

    let amount = match input.trim().parse::<i64>() {
        Ok(n) if n > 0 => n,
        _ => {
            bot.send_message(chat_id, "Пожалуйста, введите корректное положительное число.")
                .await?;
            return Ok(());
        }
    };

    let state = AppState::get()?;
    match state.bonuses.adjust(ctx.identity(), target, amount, kind).await {
        Ok(new_balance) => {
            let notifier = Notifier::new(bot.clone());
            let notice = match kind {
                BonusKind::Add => format!("🎉 Вам начислено {} бонусов!\nВаш баланс: {}", amount, new_balance),
                BonusKind::Subtract => {
                    format!("С вашего счета списано {} бонусов.\nВаш баланс: {}", amount, new_balance)
                }
            };
            if let Err(e) = notifier.send(target, &notice).await {
                warn!("Failed to notify bonus target {}: {}", target, e);
            }

            dialogue.update(DialogueState::Idle).await?;
            bot.send_message(
                chat_id,
                format!("✅ Готово! Новый баланс пользователя {}: {}", full_name, new_balance),
            )
            .reply_markup(keyboard::admin_panel())
            .await?;
        }
        Err(BotError::InsufficientBalance { balance }) => {
            bot.send_message(
                chat_id,
                format!("У пользователя недостаточно бонусов. Текущий баланс: {}", balance),
            )
            .await?;
        }
        Err(BotError::TargetNotFound(_)) => {
            dialogue.update(DialogueState::Idle).await?;
            bot.send_message(chat_id, "Пользователь не найден.")
                .reply_markup(keyboard::admin_panel())
                .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
