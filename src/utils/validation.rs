use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+7\d{10}$").unwrap());

static DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}\.\d{2}\.\d{4}$").unwrap());

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static NAME_PART_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[А-ЯЁ][а-яё]+$").unwrap());

static TIME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").unwrap());

pub fn validate_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone)
}

/// Strict DD.MM.YYYY, a real calendar date, year between 1900 and the current year.
pub fn validate_date(date: &str) -> bool {
    if !DATE_REGEX.is_match(date) {
        return false;
    }

    let mut parts = date.split('.');
    let (day, month, year) = match (parts.next(), parts.next(), parts.next()) {
        (Some(d), Some(m), Some(y)) => match (d.parse::<u32>(), m.parse::<u32>(), y.parse::<i32>()) {
            (Ok(d), Ok(m), Ok(y)) => (d, m, y),
            _ => return false,
        },
        _ => return false,
    };

    if year < 1900 || year > Local::now().year() {
        return false;
    }

    NaiveDate::from_ymd_opt(year, month, day).is_some()
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// At least three space-separated parts (Фамилия Имя Отчество), each a
/// capitalized Cyrillic word of length >= 2.
pub fn validate_full_name(name: &str) -> bool {
    let parts: Vec<&str> = name.trim().split(' ').filter(|p| !p.is_empty()).collect();
    parts.len() >= 3 && parts.iter().all(|part| NAME_PART_REGEX.is_match(part))
}

/// Strict zero-padded HH:MM, 24-hour.
pub fn validate_time(time: &str) -> bool {
    TIME_REGEX.is_match(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_format() {
        assert!(validate_phone("+79991234567"));

        assert!(!validate_phone("79991234567"));
        assert!(!validate_phone("+7999123456")); // 9 digits
        assert!(!validate_phone("+799912345678")); // 11 digits
        assert!(!validate_phone("+7 999 123 45 67"));
        assert!(!validate_phone("+89991234567"));
    }

    #[test]
    fn date_format_and_calendar() {
        assert!(validate_date("01.01.1990"));
        assert!(validate_date("29.02.2024")); // leap year
        assert!(validate_date("31.12.1900"));

        assert!(!validate_date("31.02.2024"));
        assert!(!validate_date("29.02.2023"));
        assert!(!validate_date("1.1.1990"));
        assert!(!validate_date("01/01/1990"));
        assert!(!validate_date("01.01.1899"));
        assert!(!validate_date("01.01.3000"));
        assert!(!validate_date("00.01.1990"));
        assert!(!validate_date("01.13.1990"));
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("ivanov@example.com"));
        assert!(validate_email("a@b.cd"));

        assert!(!validate_email("ivanov"));
        assert!(!validate_email("ivanov@example"));
        assert!(!validate_email("iva nov@example.com"));
        assert!(!validate_email("@example.com"));
    }

    #[test]
    fn full_name_parts() {
        assert!(validate_full_name("Иванов Иван Иванович"));
        assert!(validate_full_name("Ёлкина Анна Сергеевна"));

        assert!(!validate_full_name("Иванов Иван"));
        assert!(!validate_full_name("Иванов"));
        assert!(!validate_full_name("иванов иван иванович"));
        assert!(!validate_full_name("Ivanov Ivan Ivanovich"));
        assert!(!validate_full_name("Иванов Иван И1анович"));
        assert!(!validate_full_name("Иванов Иван И"));
    }

    #[test]
    fn time_format() {
        assert!(validate_time("14:30"));
        assert!(validate_time("00:00"));
        assert!(validate_time("23:59"));

        assert!(!validate_time("24:00"));
        assert!(!validate_time("9:30"));
        assert!(!validate_time("14:60"));
        assert!(!validate_time("14-30"));
    }
}
