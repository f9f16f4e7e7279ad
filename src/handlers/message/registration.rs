use teloxide::prelude::*;
use teloxide::types::KeyboardRemove;

use crate::error::HandlerResult;
use crate::handlers::{screens, RequestContext};
use crate::services::dialogue::ProfileField;
use crate::services::notifier::Notifier;
use crate::services::profile::{RegistrationStep, UserProfile};
use crate::services::referral::ReferralService;
use crate::state::AppState;
use crate::utils::{keyboard, text, validation};

const WELCOME: &str = "Добро пожаловать в бот стоматологической клиники! 🦷\n\n\
    Для начала работы необходимо пройти регистрацию.\n\n\
    Пожалуйста, поделитесь номером телефона или введите его вручную в формате +7XXXXXXXXXX:";

/// Entry point for `/start`. Known users resume where they left off, new
/// users get a fresh registration record (crediting the referrer when the
/// deep link carries one).
pub async fn start(bot: &Bot, msg: &Message, ctx: &RequestContext, payload: &str) -> HandlerResult {
    let state = AppState::get()?;
    let chat_id = msg.chat.id;

    match state.profiles.get(ctx.identity()).await? {
        Some(user) if user.is_completed() => {
            screens::show_main_menu(bot, chat_id, ctx.is_admin, "С возвращением! Выберите действие:").await
        }
        Some(user) => prompt_step(bot, chat_id, user.registration_step).await,
        None => {
            state
                .profiles
                .begin_registration(ctx.identity(), ctx.username.as_deref())
                .await?;

            if let Some(referrer) = ReferralService::parse_start_payload(payload) {
                if state.referrals.record(referrer, ctx.identity()).await? {
                    let notifier = Notifier::new(bot.clone());
                    if let Err(e) = notifier
                        .send(referrer, "🎉 По вашей реферальной ссылке зарегистрировался новый пользователь!")
                        .await
                    {
                        warn!("Failed to notify referrer {}: {}", referrer, e);
                    }
                }
            }

            bot.send_message(chat_id, WELCOME)
                .reply_markup(keyboard::phone_request())
                .await?;
            Ok(())
        }
    }
}

/// Re-issues the prompt for the step the registration cursor points at.
pub async fn prompt_step(bot: &Bot, chat_id: ChatId, step: RegistrationStep) -> HandlerResult {
    match step {
        RegistrationStep::Phone => {
            bot.send_message(
                chat_id,
                "Пожалуйста, поделитесь номером телефона или введите его вручную в формате +7XXXXXXXXXX:",
            )
            .reply_markup(keyboard::phone_request())
            .await?;
        }
        RegistrationStep::Birthdate => {
            bot.send_message(chat_id, "Введите вашу дату рождения в формате ДД.ММ.ГГГГ:")
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
        RegistrationStep::Email => {
            bot.send_message(chat_id, "Введите ваш email или нажмите «⏭️ Пропустить»:")
                .reply_markup(keyboard::skip())
                .await?;
        }
        RegistrationStep::Gender => {
            bot.send_message(chat_id, "Укажите ваш пол:")
                .reply_markup(keyboard::gender_choice())
                .await?;
        }
        RegistrationStep::FullName => {
            bot.send_message(chat_id, "Введите ваше ФИО (Фамилия Имя Отчество):")
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
        RegistrationStep::Completed => {
            bot.send_message(chat_id, "Выберите действие:")
                .reply_markup(keyboard::main_menu(false))
                .await?;
        }
    }
    Ok(())
}

/// Consumes one text answer for the current registration step and advances
/// the cursor on success.
pub async fn handle_step(
    bot: &Bot,
    msg: &Message,
    ctx: &RequestContext,
    user: &UserProfile,
    input: &str,
) -> HandlerResult {
    let state = AppState::get()?;
    let chat_id = msg.chat.id;

    match user.registration_step {
        RegistrationStep::Phone => {
            if input == keyboard::BTN_ENTER_PHONE_MANUALLY {
                bot.send_message(chat_id, "Введите номер телефона в формате +7XXXXXXXXXX:")
                    .await?;
                return Ok(());
            }
            if !validation::validate_phone(input) {
                bot.send_message(chat_id, text::validation_error_message(ProfileField::Phone))
                    .await?;
                return Ok(());
            }
            state.profiles.update_field(ctx.identity(), ProfileField::Phone, input).await?;
            state.profiles.set_step(ctx.identity(), RegistrationStep::Birthdate).await?;
            bot.send_message(chat_id, "Спасибо! Теперь введите вашу дату рождения в формате ДД.ММ.ГГГГ:")
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
        RegistrationStep::Birthdate => {
            if !validation::validate_date(input) {
                bot.send_message(chat_id, text::validation_error_message(ProfileField::Birthdate))
                    .await?;
                return Ok(());
            }
            state
                .profiles
                .update_field(ctx.identity(), ProfileField::Birthdate, input)
                .await?;
            state.profiles.set_step(ctx.identity(), RegistrationStep::Email).await?;
            bot.send_message(chat_id, "Введите ваш email или нажмите «⏭️ Пропустить»:")
                .reply_markup(keyboard::skip())
                .await?;
        }
        RegistrationStep::Email => {
            if input != keyboard::BTN_SKIP {
                if !validation::validate_email(input) {
                    bot.send_message(chat_id, text::validation_error_message(ProfileField::Email))
                        .await?;
                    return Ok(());
                }
                state.profiles.update_field(ctx.identity(), ProfileField::Email, input).await?;
            }
            state.profiles.set_step(ctx.identity(), RegistrationStep::Gender).await?;
            bot.send_message(chat_id, "Укажите ваш пол:")
                .reply_markup(keyboard::gender_choice())
                .await?;
        }
        RegistrationStep::Gender => {
            // Gender is chosen via the inline keyboard, not typed.
            bot.send_message(chat_id, text::validation_error_message(ProfileField::Gender))
                .reply_markup(keyboard::gender_choice())
                .await?;
        }
        RegistrationStep::FullName => {
            if !validation::validate_full_name(input) {
                bot.send_message(chat_id, text::validation_error_message(ProfileField::FullName))
                    .await?;
                return Ok(());
            }
            state
                .profiles
                .update_field(ctx.identity(), ProfileField::FullName, input)
                .await?;
            state.profiles.set_step(ctx.identity(), RegistrationStep::Completed).await?;
            screens::show_main_menu(
                bot,
                chat_id,
                ctx.is_admin,
                "✅ Регистрация успешно завершена!\n\nТеперь вам доступны все функции бота.",
            )
            .await?;
        }
        RegistrationStep::Completed => {}
    }
    Ok(())
}

/// Shared-contact answer to the phone step. Only the sender's own contact is
/// accepted.
pub async fn handle_contact(bot: Bot, msg: Message, ctx: RequestContext) -> HandlerResult {
    let state = AppState::get()?;
    let chat_id = msg.chat.id;
    let Some(contact) = msg.contact() else {
        return Ok(());
    };

    if contact.user_id != Some(ctx.user_id) {
        bot.send_message(chat_id, "Пожалуйста, поделитесь своим собственным номером телефона.")
            .await?;
        return Ok(());
    }

    let user = match state.profiles.get(ctx.identity()).await? {
        Some(user) => user,
        None => {
            state
                .profiles
                .begin_registration(ctx.identity(), ctx.username.as_deref())
                .await?;
            state.profiles.get(ctx.identity()).await?.ok_or("registration record missing")?
        }
    };
    if user.registration_step != RegistrationStep::Phone {
        return Ok(());
    }

    let raw = contact.phone_number.trim().to_string();
    let phone = if raw.starts_with('+') { raw } else { format!("+{}", raw) };

    state.profiles.update_field(ctx.identity(), ProfileField::Phone, &phone).await?;
    state.profiles.set_step(ctx.identity(), RegistrationStep::Birthdate).await?;
    bot.send_message(chat_id, "Спасибо! Теперь введите вашу дату рождения в формате ДД.ММ.ГГГГ:")
        .reply_markup(KeyboardRemove::new())
        .await?;
    Ok(())
}
