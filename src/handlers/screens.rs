use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html::escape;

use crate::config::AppConfig;
use crate::error::HandlerResult;
use crate::services::appointment::{RequestCard, RequestStatus};
use crate::services::dialogue::{BotDialogue, DialogueState};
use crate::state::AppState;
use crate::utils::{keyboard, text};

pub async fn show_main_menu(bot: &Bot, chat_id: ChatId, is_admin: bool, message: &str) -> HandlerResult {
    bot.send_message(chat_id, message)
        .reply_markup(keyboard::main_menu(is_admin))
        .await?;
    Ok(())
}

pub async fn show_admin_panel(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    let state = AppState::get()?;
    let users = state.profiles.stats().await?;
    let requests = state.appointments.stats().await?;
    let referrers = state.referrals.active_referrers().await?;

    let message = format!(
        "<b>⚙️ Админ-панель</b>\n\n\
         📊 <b>Общая статистика:</b>\n\
         • Всего пользователей: {}\n\
         • Новых за сегодня: {}\n\n\
         📝 <b>Заявки:</b>\n\
         • Ожидают обработки: {}\n\
         • Одобрено всего: {}\n\
         • Создано сегодня: {}\n\n\
         🤝 <b>Рефералы:</b>\n\
         • Активных рефереров: {}\n\n\
         Выберите нужный раздел:",
        users.total, users.new_today, requests.pending, requests.approved, requests.today, referrers
    );

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard::admin_panel())
        .await?;
    Ok(())
}

pub async fn show_detailed_statistics(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    let state = AppState::get()?;
    let users = state.profiles.stats().await?;
    let requests = state.appointments.stats().await?;

    let message = format!(
        "<b>📊 Подробная статистика</b>\n\n\
         <b>👥 Пользователи:</b>\n\
         • Всего: {}\n\
         • За сегодня: {}\n\
         • За неделю: {}\n\
         • За месяц: {}\n\n\
         <b>📝 Заявки:</b>\n\
         • Всего: {}\n\
         • Ожидают: {}\n\
         • Одобрены: {}\n\
         • Отклонены: {}\n\
         • За сегодня: {}\n",
        users.total,
        users.new_today,
        users.new_last_week,
        users.new_last_month,
        requests.total,
        requests.pending,
        requests.approved,
        requests.rejected,
        requests.today
    );

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard::statistics_exports())
        .await?;
    Ok(())
}

pub async fn show_profile(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    let state = AppState::get()?;
    let Some(user) = state.profiles.get(chat_id.0).await? else {
        bot.send_message(chat_id, "Профиль не найден.").await?;
        return Ok(());
    };

    let message = format!(
        "<b>👤 Ваш профиль</b>\n\n\
         <b>ФИО:</b> {}\n\
         <b>Телефон:</b> {}\n\
         <b>Email:</b> {}\n\
         <b>Дата рождения:</b> {}\n\
         <b>Пол:</b> {}\n\
         <b>Бонусы:</b> {}\n\
         <b>ID:</b> <code>{}</code>\n\
         <b>Дата регистрации:</b> {}",
        escape(user.full_name.as_deref().unwrap_or("Не указано")),
        escape(user.phone.as_deref().unwrap_or("Не указан")),
        escape(user.email.as_deref().unwrap_or("Не указан")),
        escape(user.birthdate.as_deref().unwrap_or("Не указана")),
        text::gender_text(user.gender),
        user.bonuses,
        user.telegram_id,
        text::format_timestamp(&user.created_at)
    );

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard::own_profile())
        .await?;
    Ok(())
}

pub async fn show_my_appointments(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    let state = AppState::get()?;
    let appointments = state.appointments.for_user(chat_id.0).await?;

    if appointments.is_empty() {
        bot.send_message(chat_id, "У вас пока нет записей на прием.").await?;
        return Ok(());
    }

    let mut message = String::from("<b>📅 Ваши записи на прием:</b>\n\n");
    for appointment in &appointments {
        message.push_str(&format!(
            "<b>Заявка от:</b> {}\n<b>Статус:</b> {}\n",
            text::format_timestamp(&appointment.created_at),
            text::status_text(appointment.status)
        ));
        if appointment.status == RequestStatus::Approved {
            if let (Some(date), Some(time)) = (&appointment.appointment_date, &appointment.appointment_time) {
                message.push_str(&format!(
                    "<b>Дата приёма:</b> {}\n<b>Время приёма:</b> {}\n",
                    escape(date),
                    escape(time)
                ));
            }
        }
        if let Some(comment) = &appointment.admin_comment {
            message.push_str(&format!("<b>Комментарий:</b> {}\n", escape(comment)));
        }
        message.push('\n');
    }

    bot.send_message(chat_id, message).parse_mode(ParseMode::Html).await?;
    Ok(())
}

/// Appointment confirmation screen; moves the dialogue to `ConfirmingAppointment`.
pub async fn show_confirmation(bot: &Bot, dialogue: &BotDialogue, chat_id: ChatId) -> HandlerResult {
    let state = AppState::get()?;
    let Some(user) = state.profiles.get(chat_id.0).await? else {
        bot.send_message(chat_id, "Пожалуйста, сначала пройдите регистрацию.")
            .await?;
        return Ok(());
    };

    let message = format!(
        "<b>📝 Запись на прием</b>\n\n\
         Пожалуйста, проверьте ваши данные:\n\n{}\n\
         Все данные указаны верно?",
        text::profile_summary(&user)
    );

    dialogue.update(DialogueState::ConfirmingAppointment).await?;
    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard::appointment_confirm())
        .await?;
    Ok(())
}

pub async fn show_edit_fields(bot: &Bot, dialogue: &BotDialogue, chat_id: ChatId) -> HandlerResult {
    dialogue.update(DialogueState::ChoosingEditField).await?;
    bot.send_message(chat_id, "Выберите, что хотите изменить:")
        .reply_markup(keyboard::edit_fields())
        .await?;
    Ok(())
}

fn request_card_text(card: &RequestCard) -> String {
    format!(
        "<b>📝 Заявка #{}</b>\n\n\
         👤 <b>От:</b> {}\n\
         📱 <b>Телефон:</b> {}\n\
         📧 <b>Email:</b> {}\n\
         🔗 <b>Username:</b> {}\n\
         📅 <b>Создана:</b> {}",
        card.request.id,
        escape(card.full_name.as_deref().unwrap_or("Не указано")),
        escape(card.phone.as_deref().unwrap_or("Не указан")),
        escape(card.email.as_deref().unwrap_or("Не указан")),
        text::username_text(card.username.as_deref()),
        text::format_timestamp(&card.request.created_at)
    )
}

pub async fn show_pending_requests(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    let state = AppState::get()?;
    let requests = state.appointments.pending().await?;

    if requests.is_empty() {
        bot.send_message(chat_id, "Нет ожидающих заявок.")
            .reply_markup(keyboard::admin_panel())
            .await?;
        return Ok(());
    }

    for card in &requests {
        bot.send_message(chat_id, request_card_text(card))
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard::pending_request_actions(card.request.id, card.request.telegram_id))
            .await?;
    }
    Ok(())
}

pub async fn show_specific_request(bot: &Bot, chat_id: ChatId, request_id: i64) -> HandlerResult {
    let state = AppState::get()?;
    let Some(card) = state.appointments.get_card(request_id).await? else {
        bot.send_message(chat_id, "Заявка не найдена.").await?;
        return Ok(());
    };

    let gender = card.gender.as_deref().and_then(crate::services::profile::Gender::from_str);
    let message = format!(
        "<b>📝 Заявка #{}</b>\n\n\
         👤 <b>Пациент:</b> {}\n\
         📱 <b>Телефон:</b> {}\n\
         📧 <b>Email:</b> {}\n\
         📅 <b>Дата рождения:</b> {}\n\
         👥 <b>Пол:</b> {}\n\
         🔗 <b>Username:</b> {}\n\
         ⏰ <b>Дата создания:</b> {}",
        card.request.id,
        escape(card.full_name.as_deref().unwrap_or("Не указано")),
        escape(card.phone.as_deref().unwrap_or("Не указан")),
        escape(card.email.as_deref().unwrap_or("Не указан")),
        escape(card.birthdate.as_deref().unwrap_or("Не указана")),
        text::gender_text(gender),
        text::username_text(card.username.as_deref()),
        text::format_timestamp(&card.request.created_at)
    );

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard::specific_request_actions(card.request.id, card.request.telegram_id))
        .await?;
    Ok(())
}

pub async fn show_request_history(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    let state = AppState::get()?;
    let requests = state.appointments.history().await?;

    if requests.is_empty() {
        bot.send_message(chat_id, "История заявок пуста.").await?;
        return Ok(());
    }

    for card in &requests {
        let request = &card.request;
        let mut message = format!(
            "<b>{} Заявка #{}</b>\n\n\
             👤 <b>От:</b> {}\n\
             📱 <b>Телефон:</b> {}\n\
             📧 <b>Email:</b> {}\n\
             🔗 <b>Username:</b> {}\n\
             📅 <b>Создана:</b> {}\n\
             ⏰ <b>Обработана:</b> {}\n",
            text::status_emoji(request.status),
            request.id,
            escape(card.full_name.as_deref().unwrap_or("Не указано")),
            escape(card.phone.as_deref().unwrap_or("Не указан")),
            escape(card.email.as_deref().unwrap_or("Не указан")),
            text::username_text(card.username.as_deref()),
            text::format_timestamp(&request.created_at),
            text::format_timestamp(request.processed_at.as_deref().unwrap_or(""))
        );
        if request.status == RequestStatus::Approved {
            if let (Some(date), Some(time)) = (&request.appointment_date, &request.appointment_time) {
                message.push_str(&format!(
                    "📆 <b>Дата приёма:</b> {}\n🕒 <b>Время приёма:</b> {}\n",
                    escape(date),
                    escape(time)
                ));
            }
        }
        if let Some(comment) = &request.admin_comment {
            message.push_str(&format!("💬 <b>Комментарий:</b> {}\n", escape(comment)));
        }

        bot.send_message(chat_id, message).parse_mode(ParseMode::Html).await?;
    }
    Ok(())
}

pub async fn show_admin_user_profile(bot: &Bot, chat_id: ChatId, target_id: i64) -> HandlerResult {
    let state = AppState::get()?;
    let Some(user) = state.profiles.get(target_id).await? else {
        bot.send_message(chat_id, "Пользователь не найден.").await?;
        return Ok(());
    };
    let stats = state.appointments.user_stats(target_id).await?;

    let message = format!(
        "<b>👤 Профиль пользователя</b>\n\n\
         <b>ID:</b> <code>{}</code>\n\
         <b>Username:</b> {}\n\
         <b>ФИО:</b> {}\n\
         <b>Телефон:</b> {}\n\
         <b>Email:</b> {}\n\
         <b>Дата рождения:</b> {}\n\
         <b>Пол:</b> {}\n\
         <b>Бонусы:</b> {}\n\
         <b>Регистрация:</b> {}\n\n\
         <b>📊 Статистика заявок:</b>\n\
         • Всего: {}\n\
         • Ожидают: {}\n\
         • Одобрены: {}\n\
         • Отклонены: {}",
        user.telegram_id,
        text::username_text(user.username.as_deref()),
        escape(user.full_name.as_deref().unwrap_or("Не указано")),
        escape(user.phone.as_deref().unwrap_or("Не указан")),
        escape(user.email.as_deref().unwrap_or("Не указан")),
        escape(user.birthdate.as_deref().unwrap_or("Не указана")),
        text::gender_text(user.gender),
        user.bonuses,
        text::format_timestamp(&user.created_at),
        stats.total,
        stats.pending,
        stats.approved,
        stats.rejected
    );

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard::admin_user_profile(target_id))
        .await?;
    Ok(())
}

/// Admin view of one user's request list.
pub async fn show_user_requests(bot: &Bot, chat_id: ChatId, target_id: i64) -> HandlerResult {
    let state = AppState::get()?;
    let requests = state.appointments.for_user(target_id).await?;

    if requests.is_empty() {
        bot.send_message(chat_id, "У пользователя нет заявок.").await?;
        return Ok(());
    }

    let mut message = String::from("<b>📝 Заявки пользователя:</b>\n\n");
    for request in &requests {
        message.push_str(&format!(
            "{} Заявка #{} от {}\n",
            text::status_emoji(request.status),
            request.id,
            text::format_timestamp(&request.created_at)
        ));
    }

    bot.send_message(chat_id, message).parse_mode(ParseMode::Html).await?;
    Ok(())
}

pub async fn show_promotions(bot: &Bot, chat_id: ChatId, is_admin: bool) -> HandlerResult {
    let state = AppState::get()?;
    let promotions = state.promotions.active().await?;

    if promotions.is_empty() {
        bot.send_message(chat_id, "В данный момент нет активных акций.").await?;
        return Ok(());
    }

    for promo in &promotions {
        let mut message = format!(
            "<b>🎉 Акция от {}</b>\n\n{}\n",
            text::format_timestamp(&promo.created_at),
            escape(&promo.text)
        );
        if is_admin {
            message.push_str(&format!("\n👁 Просмотров: {}", promo.view_count));
        }

        bot.send_message(chat_id, message).parse_mode(ParseMode::Html).await?;

        if !is_admin {
            state.promotions.record_view(promo.id, chat_id.0).await?;
        }
    }

    show_main_menu(bot, chat_id, is_admin, "Выберите действие:").await
}

pub async fn show_clinic_info(bot: &Bot, chat_id: ChatId, is_admin: bool) -> HandlerResult {
    let info = "<b>🏥 О нашей клинике</b>\n\n\
        Мы - современная стоматологическая клиника, оснащенная передовым оборудованием \
        и укомплектованная опытными специалистами.\n\n\
        <b>🕒 График работы:</b>\n\
        Пн-Пт: 9:00 - 20:00\n\
        Сб: 10:00 - 18:00\n\
        Вс: выходной\n\n\
        <b>📍 Адрес:</b>\n\
        г. Москва, ул. Примерная, д. 123\n\n\
        <b>📱 Контакты:</b>\n\
        Телефон: +7 (999) 123-45-67\n\
        Email: info@dentclinic.ru\n\n\
        <b>🌟 Наши услуги:</b>\n\
        • Профессиональная чистка\n\
        • Лечение кариеса\n\
        • Имплантация\n\
        • Протезирование\n\
        • Исправление прикуса\n\
        • Отбеливание";

    bot.send_message(chat_id, info)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard::main_menu(is_admin))
        .await?;
    Ok(())
}

pub async fn show_reviews(bot: &Bot, chat_id: ChatId, is_admin: bool) -> HandlerResult {
    let message = "<b>💬 Отзывы о клинике</b>\n\n\
        Нам важно ваше мнение! Поделитесь впечатлениями о посещении клиники — \
        просто напишите администратору, и мы опубликуем ваш отзыв.\n\n\
        Почитать отзывы других пациентов можно на нашей странице в картах и на сайте клиники.";

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard::main_menu(is_admin))
        .await?;
    Ok(())
}

pub async fn show_referral(bot: &Bot, chat_id: ChatId, is_admin: bool) -> HandlerResult {
    let state = AppState::get()?;
    let config = AppConfig::get()?;

    let Some(user) = state.profiles.get(chat_id.0).await? else {
        bot.send_message(chat_id, "Пожалуйста, сначала пройдите регистрацию.")
            .await?;
        return Ok(());
    };

    let link = format!("https://t.me/{}?start=ref{}", config.telegram.bot_username, chat_id.0);
    let message = format!(
        "<b>🤝 Реферальная программа</b>\n\n\
         Приглашайте друзей в нашу клинику и получайте бонусы!\n\n\
         <b>Ваша статистика:</b>\n\
         • Приглашено пациентов: {}\n\n\
         <b>Ваша реферальная ссылка:</b>\n\
         <code>{}</code>\n\n\
         <b>Как это работает:</b>\n\
         1. Отправьте вашу реферальную ссылку друзьям\n\
         2. Когда они перейдут по ссылке и запишутся на приём, вы получите уведомление\n\
         3. После их первого посещения вы получите бонус",
        user.referral_count, link
    );

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard::main_menu(is_admin))
        .await?;
    Ok(())
}
