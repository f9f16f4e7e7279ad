use rust_xlsxwriter::{Workbook, XlsxError};

use crate::error::{BotError, BotResult};
use crate::services::appointment::RequestCard;
use crate::services::profile::UserProfile;
use crate::utils::text;

fn export_err(e: XlsxError) -> BotError {
    BotError::Export(e.to_string())
}

/// XLSX report with every registered user, newest first.
pub fn registrations_report(users: &[UserProfile]) -> BotResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Регистрации").map_err(export_err)?;

    let headers = [
        "ID",
        "Username",
        "ФИО",
        "Телефон",
        "Email",
        "Дата рождения",
        "Пол",
        "Дата регистрации",
        "Последняя активность",
    ];
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header).map_err(export_err)?;
    }

    for (i, user) in users.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet
            .write_number(row, 0, user.telegram_id as f64)
            .map_err(export_err)?;
        worksheet
            .write_string(row, 1, user.username.as_deref().unwrap_or(""))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 2, user.full_name.as_deref().unwrap_or(""))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 3, user.phone.as_deref().unwrap_or(""))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 4, user.email.as_deref().unwrap_or(""))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 5, user.birthdate.as_deref().unwrap_or(""))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 6, text::gender_text(user.gender))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 7, &text::format_timestamp(&user.created_at))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 8, &text::format_timestamp(&user.last_activity))
            .map_err(export_err)?;
    }

    workbook.save_to_buffer().map_err(export_err)
}

/// XLSX report with every appointment request, newest first.
pub fn appointments_report(cards: &[RequestCard]) -> BotResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Заявки").map_err(export_err)?;

    let headers = [
        "ID заявки",
        "ФИО",
        "Username",
        "Телефон",
        "Email",
        "Статус",
        "Дата создания",
        "Дата приёма",
        "Время приёма",
        "Комментарий",
    ];
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header).map_err(export_err)?;
    }

    for (i, card) in cards.iter().enumerate() {
        let row = (i + 1) as u32;
        let request = &card.request;
        worksheet.write_number(row, 0, request.id as f64).map_err(export_err)?;
        worksheet
            .write_string(row, 1, card.full_name.as_deref().unwrap_or(""))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 2, card.username.as_deref().unwrap_or(""))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 3, card.phone.as_deref().unwrap_or(""))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 4, card.email.as_deref().unwrap_or(""))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 5, text::status_text(request.status))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 6, &text::format_timestamp(&request.created_at))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 7, request.appointment_date.as_deref().unwrap_or("Не назначена"))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 8, request.appointment_time.as_deref().unwrap_or("Не назначено"))
            .map_err(export_err)?;
        worksheet
            .write_string(row, 9, request.admin_comment.as_deref().unwrap_or(""))
            .map_err(export_err)?;
    }

    workbook.save_to_buffer().map_err(export_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::profile::{Gender, RegistrationStep};

    fn sample_user() -> UserProfile {
        UserProfile {
            telegram_id: 100,
            phone: Some("+79991234567".to_string()),
            email: None,
            birthdate: Some("01.01.1990".to_string()),
            gender: Some(Gender::Male),
            full_name: Some("Иванов Иван Иванович".to_string()),
            registration_step: RegistrationStep::Completed,
            referral_count: 0,
            is_admin: false,
            created_at: "2025-01-01 10:00:00".to_string(),
            last_activity: "2025-01-02 12:00:00".to_string(),
            username: Some("ivan".to_string()),
            bonuses: 0,
        }
    }

    #[test]
    fn registrations_report_produces_xlsx_bytes() {
        let bytes = registrations_report(&[sample_user()]).unwrap();
        // XLSX files are zip archives.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn empty_reports_still_render_headers() {
        let bytes = appointments_report(&[]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
