use teloxide::dispatching::dialogue::GetChatId;
use teloxide::{dispatching::UpdateHandler, prelude::*};
use teloxide::types::InputFile;
use teloxide::utils::html::escape;

use crate::error::{BotError, HandlerResult};
use crate::services::appointment::Decision;
use crate::services::dialogue::{BotDialogue, DialogueState, EditTarget, ProfileField};
use crate::services::export;
use crate::services::notifier::Notifier;
use crate::services::profile::{Gender, RegistrationStep};
use crate::state::AppState;
use crate::utils::{keyboard, text};

use super::message::editing;
use super::{screens, RequestContext};

pub fn get_callback_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    Update::filter_callback_query().endpoint(handle_callback)
}

fn parse_suffix(data: &str, prefix: &str) -> Option<i64> {
    data.strip_prefix(prefix)?.parse().ok()
}

async fn handle_callback(bot: Bot, dialogue: BotDialogue, q: CallbackQuery, ctx: RequestContext) -> HandlerResult {
    let data = q.data.clone().unwrap_or_default();
    let chat_id = q.chat_id();
    bot.answer_callback_query(q.id).await?;
    let Some(chat_id) = chat_id else {
        return Ok(());
    };

    match data.as_str() {
        "gender_male" => handle_registration_gender(&bot, chat_id, &ctx, Gender::Male).await,
        "gender_female" => handle_registration_gender(&bot, chat_id, &ctx, Gender::Female).await,
        "gender_edit_male" => handle_edit_gender(&bot, &dialogue, chat_id, &ctx, Gender::Male).await,
        "gender_edit_female" => handle_edit_gender(&bot, &dialogue, chat_id, &ctx, Gender::Female).await,

        "appointment_confirm" => handle_appointment_confirm(&bot, &dialogue, chat_id, &ctx).await,
        "appointment_edit" => screens::show_edit_fields(&bot, &dialogue, chat_id).await,

        "edit_phone" => start_single_edit(&bot, &dialogue, chat_id, ProfileField::Phone).await,
        "edit_birthdate" => start_single_edit(&bot, &dialogue, chat_id, ProfileField::Birthdate).await,
        "edit_email" => start_single_edit(&bot, &dialogue, chat_id, ProfileField::Email).await,
        "edit_fullname" => start_single_edit(&bot, &dialogue, chat_id, ProfileField::FullName).await,
        "edit_gender" => {
            dialogue
                .update(DialogueState::Editing(EditTarget::Single(ProfileField::Gender)))
                .await?;
            bot.send_message(chat_id, "Выберите пол:")
                .reply_markup(keyboard::gender_edit_choice())
                .await?;
            Ok(())
        }
        "edit_all" => {
            dialogue
                .update(DialogueState::Editing(EditTarget::All {
                    current: ProfileField::Phone,
                }))
                .await?;
            bot.send_message(
                chat_id,
                "Давайте обновим все данные.\n\nВведите номер телефона в формате +7XXXXXXXXXX:",
            )
            .reply_markup(keyboard::back_to_appointment())
            .await?;
            Ok(())
        }
        "edit_back" => screens::show_confirmation(&bot, &dialogue, chat_id).await,
        "edit_profile" => screens::show_edit_fields(&bot, &dialogue, chat_id).await,
        "my_appointments" => screens::show_my_appointments(&bot, chat_id).await,

        admin_data if ctx.is_admin => handle_admin_callback(&bot, &dialogue, chat_id, &ctx, admin_data).await,
        _ => Ok(()),
    }
}

async fn handle_admin_callback(
    bot: &Bot,
    dialogue: &BotDialogue,
    chat_id: ChatId,
    ctx: &RequestContext,
    data: &str,
) -> HandlerResult {
    if let Some(request_id) = parse_suffix(data, "approve_request_") {
        return start_approval(bot, dialogue, chat_id, request_id).await;
    }
    if let Some(request_id) = parse_suffix(data, "reject_request_") {
        return handle_reject(bot, chat_id, ctx, request_id).await;
    }
    if let Some(request_id) = parse_suffix(data, "comment_request_") {
        dialogue.update(DialogueState::AwaitingComment { request_id }).await?;
        bot.send_message(chat_id, "Введите комментарий к заявке:")
            .reply_markup(keyboard::back_to_appointment())
            .await?;
        return Ok(());
    }
    if let Some(user_id) = parse_suffix(data, "view_user_") {
        return screens::show_admin_user_profile(bot, chat_id, user_id).await;
    }
    if let Some(request_id) = parse_suffix(data, "view_request_") {
        return screens::show_specific_request(bot, chat_id, request_id).await;
    }
    if let Some(user_id) = parse_suffix(data, "user_appointments_") {
        return screens::show_user_requests(bot, chat_id, user_id).await;
    }

    match data {
        "admin_statistics_registrations" => send_registrations_export(bot, chat_id).await,
        "admin_statistics_appointments" => send_appointments_export(bot, chat_id).await,
        "admin_view_requests" => screens::show_pending_requests(bot, chat_id).await,
        "back_to_admin_panel" => screens::show_admin_panel(bot, chat_id).await,
        _ => Ok(()),
    }
}

async fn handle_registration_gender(bot: &Bot, chat_id: ChatId, ctx: &RequestContext, gender: Gender) -> HandlerResult {
    let state = AppState::get()?;
    let Some(user) = state.profiles.get(ctx.identity()).await? else {
        return Ok(());
    };
    if user.registration_step != RegistrationStep::Gender {
        return Ok(());
    }

    state.profiles.set_gender(ctx.identity(), gender).await?;
    state.profiles.set_step(ctx.identity(), RegistrationStep::FullName).await?;
    bot.send_message(chat_id, "Введите ваше ФИО (Фамилия Имя Отчество):").await?;
    Ok(())
}

async fn handle_edit_gender(
    bot: &Bot,
    dialogue: &BotDialogue,
    chat_id: ChatId,
    ctx: &RequestContext,
    gender: Gender,
) -> HandlerResult {
    let state = AppState::get()?;
    state.profiles.set_gender(ctx.identity(), gender).await?;

    match dialogue.get().await? {
        Some(DialogueState::Editing(EditTarget::All { .. })) => {
            dialogue
                .update(DialogueState::Editing(EditTarget::All {
                    current: ProfileField::FullName,
                }))
                .await?;
            bot.send_message(chat_id, editing::prompt_for(ProfileField::FullName))
                .reply_markup(keyboard::back_to_appointment())
                .await?;
            Ok(())
        }
        _ => screens::show_confirmation(bot, dialogue, chat_id).await,
    }
}

async fn start_single_edit(bot: &Bot, dialogue: &BotDialogue, chat_id: ChatId, field: ProfileField) -> HandlerResult {
    dialogue
        .update(DialogueState::Editing(EditTarget::Single(field)))
        .await?;
    bot.send_message(chat_id, editing::prompt_for(field))
        .reply_markup(keyboard::back_to_appointment())
        .await?;
    Ok(())
}

async fn handle_appointment_confirm(
    bot: &Bot,
    dialogue: &BotDialogue,
    chat_id: ChatId,
    ctx: &RequestContext,
) -> HandlerResult {
    let state = AppState::get()?;
    let Some(user) = state.profiles.get(ctx.identity()).await? else {
        bot.send_message(chat_id, "Пожалуйста, сначала пройдите регистрацию.")
            .await?;
        return Ok(());
    };

    let request_id = match state.appointments.submit(&user).await {
        Ok(id) => id,
        Err(BotError::ProfileIncomplete) => {
            bot.send_message(chat_id, "Пожалуйста, сначала пройдите регистрацию.")
                .await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    dialogue.update(DialogueState::Idle).await?;
    screens::show_main_menu(
        bot,
        chat_id,
        ctx.is_admin,
        "✅ Ваша заявка успешно создана!\n\nАдминистратор свяжется с вами в ближайшее время.",
    )
    .await?;

    let notice = format!(
        "<b>🆕 Новая заявка на прием</b>\n\n\
         От: {}\n\
         Телефон: {}\n\
         Email: {}\n\
         Профиль: {}\n\
         ID пользователя: <code>{}</code>",
        escape(user.full_name.as_deref().unwrap_or("Не указано")),
        escape(user.phone.as_deref().unwrap_or("Не указан")),
        escape(user.email.as_deref().unwrap_or("Не указан")),
        text::username_text(user.username.as_deref()),
        user.telegram_id,
    );
    let admins = state.profiles.admin_ids().await?;
    let notifier = Notifier::new(bot.clone());
    notifier
        .fan_out_with_markup(
            &admins,
            &notice,
            keyboard::new_request_notification(request_id, user.telegram_id),
        )
        .await;
    Ok(())
}

async fn start_approval(bot: &Bot, dialogue: &BotDialogue, chat_id: ChatId, request_id: i64) -> HandlerResult {
    let state = AppState::get()?;
    match state.appointments.get(request_id).await? {
        None => {
            bot.send_message(chat_id, "Заявка не найдена.").await?;
        }
        Some(request) if request.status != crate::services::appointment::RequestStatus::Pending => {
            bot.send_message(chat_id, "Заявка уже обработана.").await?;
        }
        Some(_) => {
            dialogue.update(DialogueState::AwaitingDecisionDate { request_id }).await?;
            bot.send_message(chat_id, "Введите дату приёма в формате ДД.ММ.ГГГГ:")
                .reply_markup(keyboard::cancel())
                .await?;
        }
    }
    Ok(())
}

async fn handle_reject(bot: &Bot, chat_id: ChatId, ctx: &RequestContext, request_id: i64) -> HandlerResult {
    let state = AppState::get()?;
    match state.appointments.decide(ctx.identity(), request_id, Decision::Reject).await {
        Ok(request) => {
            let notifier = Notifier::new(bot.clone());
            let notice = "❌ Ваша заявка отклонена.\n\n\
                 Вы можете подать новую заявку или связаться с администратором.";
            if let Err(e) = notifier.send(request.telegram_id, notice).await {
                warn!("Failed to notify requester {}: {}", request.telegram_id, e);
            }
            bot.send_message(chat_id, format!("Заявка #{} отклонена.", request_id))
                .await?;
        }
        Err(BotError::RequestAlreadyProcessed(_)) => {
            bot.send_message(chat_id, "Заявка уже обработана.").await?;
        }
        Err(BotError::RequestNotFound(_)) => {
            bot.send_message(chat_id, "Заявка не найдена.").await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn send_registrations_export(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    let state = AppState::get()?;
    let users = state.profiles.all().await?;
    let report = export::registrations_report(&users)?;
    bot.send_document(chat_id, InputFile::memory(report).file_name("registrations.xlsx"))
        .await?;
    Ok(())
}

async fn send_appointments_export(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    let state = AppState::get()?;
    let cards = state.appointments.all_cards().await?;
    let report = export::appointments_report(&cards)?;
    bot.send_document(chat_id, InputFile::memory(report).file_name("appointments.xlsx"))
        .await?;
    Ok(())
}
