use teloxide::prelude::*;

use crate::error::HandlerResult;
use crate::handlers::{screens, RequestContext};
use crate::services::dialogue::{BotDialogue, DialogueState, EditTarget, ProfileField};
use crate::state::AppState;
use crate::utils::{keyboard, text, validation};

pub fn prompt_for(field: ProfileField) -> &'static str {
    match field {
        ProfileField::Phone => "Введите номер телефона в формате +7XXXXXXXXXX:",
        ProfileField::Birthdate => "Введите дату рождения в формате ДД.ММ.ГГГГ:",
        ProfileField::Email => "Введите email:",
        ProfileField::Gender => "Выберите пол:",
        ProfileField::FullName => "Введите ФИО (Фамилия Имя Отчество):",
    }
}

fn is_valid(field: ProfileField, value: &str) -> bool {
    match field {
        ProfileField::Phone => validation::validate_phone(value),
        ProfileField::Birthdate => validation::validate_date(value),
        ProfileField::Email => validation::validate_email(value),
        ProfileField::FullName => validation::validate_full_name(value),
        ProfileField::Gender => false,
    }
}

/// Text answer while editing profile fields before an appointment request.
/// Gender never arrives here; it is chosen via the inline keyboard.
pub async fn handle_edit_input(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    ctx: RequestContext,
    target: EditTarget,
) -> HandlerResult {
    let Some(input) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    if input == keyboard::BTN_BACK_TO_APPOINTMENT {
        return screens::show_confirmation(&bot, &dialogue, chat_id).await;
    }

    let state = AppState::get()?;

    match target {
        EditTarget::Single(ProfileField::Gender) | EditTarget::All { current: ProfileField::Gender } => {
            bot.send_message(chat_id, "Пожалуйста, выберите пол кнопкой ниже:")
                .reply_markup(keyboard::gender_edit_choice())
                .await?;
        }
        EditTarget::Single(field) => {
            if !is_valid(field, input) {
                bot.send_message(chat_id, text::validation_error_message(field)).await?;
                return Ok(());
            }
            state.profiles.update_field(ctx.identity(), field, input).await?;
            screens::show_confirmation(&bot, &dialogue, chat_id).await?;
        }
        EditTarget::All { current } => {
            if !is_valid(current, input) {
                bot.send_message(chat_id, text::validation_error_message(current)).await?;
                return Ok(());
            }
            state.profiles.update_field(ctx.identity(), current, input).await?;

            match current.next_in_cycle() {
                Some(ProfileField::Gender) => {
                    dialogue
                        .update(DialogueState::Editing(EditTarget::All {
                            current: ProfileField::Gender,
                        }))
                        .await?;
                    bot.send_message(chat_id, prompt_for(ProfileField::Gender))
                        .reply_markup(keyboard::gender_edit_choice())
                        .await?;
                }
                Some(next) => {
                    dialogue
                        .update(DialogueState::Editing(EditTarget::All { current: next }))
                        .await?;
                    bot.send_message(chat_id, prompt_for(next))
                        .reply_markup(keyboard::back_to_appointment())
                        .await?;
                }
                None => {
                    screens::show_confirmation(&bot, &dialogue, chat_id).await?;
                }
            }
        }
    }
    Ok(())
}
