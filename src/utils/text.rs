use chrono::NaiveDateTime;
use teloxide::utils::html::escape;

use crate::services::appointment::RequestStatus;
use crate::services::profile::{Gender, UserProfile};

pub fn status_text(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "⏳ Ожидает рассмотрения",
        RequestStatus::Approved => "✅ Одобрена",
        RequestStatus::Rejected => "❌ Отклонена",
    }
}

pub fn status_emoji(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "⏳",
        RequestStatus::Approved => "✅",
        RequestStatus::Rejected => "❌",
    }
}

pub fn gender_text(gender: Option<Gender>) -> &'static str {
    match gender {
        Some(g) => g.display_ru(),
        None => "Не указан",
    }
}

/// Renders a SQLite `DATETIME('now')` timestamp as `ДД.ММ.ГГГГ ЧЧ:ММ`.
/// Unparseable values are passed through untouched.
pub fn format_timestamp(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        Ok(dt) => dt.format("%d.%m.%Y %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

pub fn username_text(username: Option<&str>) -> String {
    match username {
        Some(u) => format!("@{}", escape(u)),
        None => "Не указан".to_string(),
    }
}

/// Profile fields as shown on the appointment confirmation screen.
pub fn profile_summary(user: &UserProfile) -> String {
    format!(
        "<b>👤 ФИО:</b> {}\n\
         <b>📱 Телефон:</b> {}\n\
         <b>📅 Дата рождения:</b> {}\n\
         <b>📧 Email:</b> {}\n\
         <b>👥 Пол:</b> {}\n",
        escape(user.full_name.as_deref().unwrap_or("Не указано")),
        escape(user.phone.as_deref().unwrap_or("Не указан")),
        escape(user.birthdate.as_deref().unwrap_or("Не указана")),
        escape(user.email.as_deref().unwrap_or("Не указан")),
        gender_text(user.gender),
    )
}

pub fn validation_error_message(field: crate::services::dialogue::ProfileField) -> &'static str {
    use crate::services::dialogue::ProfileField;
    match field {
        ProfileField::Phone => "Пожалуйста, введите корректный номер телефона в формате +7XXXXXXXXXX",
        ProfileField::Birthdate => "Пожалуйста, введите корректную дату в формате ДД.ММ.ГГГГ",
        ProfileField::Email => "Пожалуйста, введите корректный email",
        ProfileField::FullName => "Пожалуйста, введите ФИО полностью (Фамилия Имя Отчество)",
        ProfileField::Gender => "Пожалуйста, выберите пол кнопкой ниже",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::profile::RegistrationStep;

    #[test]
    fn timestamp_formatting() {
        assert_eq!(format_timestamp("2025-03-15 14:30:00"), "15.03.2025 14:30");
        // Unparseable input passes through.
        assert_eq!(format_timestamp("tomorrow"), "tomorrow");
    }

    #[test]
    fn summary_escapes_html() {
        let user = UserProfile {
            telegram_id: 1,
            phone: None,
            email: None,
            birthdate: None,
            gender: None,
            full_name: Some("<b>Иванов</b> Иван Иванович".to_string()),
            registration_step: RegistrationStep::Completed,
            referral_count: 0,
            is_admin: false,
            created_at: String::new(),
            last_activity: String::new(),
            username: None,
            bonuses: 0,
        };
        let summary = profile_summary(&user);
        assert!(summary.contains("&lt;b&gt;Иванов&lt;/b&gt;"));
        assert!(summary.contains("Не указан"));
    }
}
