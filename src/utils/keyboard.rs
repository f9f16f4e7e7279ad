use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};
use url::Url;

// Main menu
pub const BTN_APPOINTMENT: &str = "📝 Запись на прием";
pub const BTN_PROMOTIONS: &str = "💫 Акции";
pub const BTN_REVIEWS: &str = "💬 Отзывы";
pub const BTN_CLINIC_INFO: &str = "ℹ️ О клинике";
pub const BTN_PROFILE: &str = "👤 Профиль";
pub const BTN_REFERRAL: &str = "🤝 Рекомендовать";
pub const BTN_TEETH_ANALYSIS: &str = "🦷 Анализ зубов";
pub const BTN_ADMIN_PANEL: &str = "⚙️ Админ-панель";

// Admin panel
pub const BTN_STATISTICS: &str = "📊 Статистика";
pub const BTN_REQUESTS: &str = "📋 Заявки";
pub const BTN_BROADCAST: &str = "📢 Рассылка";
pub const BTN_ADMIN_PROMOTIONS: &str = "👥 АКЦИИ";
pub const BTN_REQUEST_HISTORY: &str = "📁 История заявок";
pub const BTN_BONUS_ADD: &str = "➕ Начислить бонусы";
pub const BTN_BONUS_SUBTRACT: &str = "➖ Списать бонусы";

// Navigation
pub const BTN_BACK_TO_MENU: &str = "◀️ Назад в меню";
pub const BTN_BACK_TO_APPOINTMENT: &str = "◀️ Назад к заявке";
pub const BTN_CANCEL: &str = "◀️ Отменить";
pub const BTN_SKIP: &str = "⏭️ Пропустить";

// Registration
pub const BTN_SHARE_PHONE: &str = "📱 Отправить номер телефона";
pub const BTN_ENTER_PHONE_MANUALLY: &str = "Ввести номер вручную";

pub fn main_menu(is_admin: bool) -> KeyboardMarkup {
    let mut rows = vec![
        vec![KeyboardButton::new(BTN_APPOINTMENT), KeyboardButton::new(BTN_PROMOTIONS)],
        vec![KeyboardButton::new(BTN_REVIEWS), KeyboardButton::new(BTN_CLINIC_INFO)],
        vec![KeyboardButton::new(BTN_PROFILE), KeyboardButton::new(BTN_REFERRAL)],
    ];
    if is_admin {
        rows.push(vec![
            KeyboardButton::new(BTN_ADMIN_PANEL),
            KeyboardButton::new(BTN_TEETH_ANALYSIS),
        ]);
    } else {
        rows.push(vec![KeyboardButton::new(BTN_TEETH_ANALYSIS)]);
    }
    KeyboardMarkup::new(rows).resize_keyboard()
}

pub fn admin_panel() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(BTN_STATISTICS), KeyboardButton::new(BTN_REQUESTS)],
        vec![
            KeyboardButton::new(BTN_BROADCAST),
            KeyboardButton::new(BTN_ADMIN_PROMOTIONS),
        ],
        vec![KeyboardButton::new(BTN_REQUEST_HISTORY)],
        vec![
            KeyboardButton::new(BTN_BONUS_ADD),
            KeyboardButton::new(BTN_BONUS_SUBTRACT),
        ],
        vec![KeyboardButton::new(BTN_BACK_TO_MENU)],
    ])
    .resize_keyboard()
}

pub fn back_to_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(BTN_BACK_TO_MENU)]]).resize_keyboard()
}

pub fn back_to_appointment() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(BTN_BACK_TO_APPOINTMENT)]]).resize_keyboard()
}

pub fn cancel() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(BTN_CANCEL)]]).resize_keyboard()
}

pub fn skip() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(BTN_SKIP)]]).resize_keyboard()
}

pub fn phone_request() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(BTN_SHARE_PHONE).request(ButtonRequest::Contact)],
        vec![KeyboardButton::new(BTN_ENTER_PHONE_MANUALLY)],
    ])
    .resize_keyboard()
}

pub fn gender_choice() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        InlineKeyboardButton::callback("Мужской", "gender_male"),
        InlineKeyboardButton::callback("Женский", "gender_female"),
    ]])
}

pub fn gender_edit_choice() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::callback("Мужской", "gender_edit_male"),
            InlineKeyboardButton::callback("Женский", "gender_edit_female"),
        ],
        vec![InlineKeyboardButton::callback("◀️ Назад к заявке", "edit_back")],
    ])
}

pub fn appointment_confirm() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        InlineKeyboardButton::callback("✅ Верно", "appointment_confirm"),
        InlineKeyboardButton::callback("✏️ Исправить", "appointment_edit"),
    ]])
}

pub fn edit_fields() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        [InlineKeyboardButton::callback("📱 Телефон", "edit_phone")],
        [InlineKeyboardButton::callback("📅 Дата рождения", "edit_birthdate")],
        [InlineKeyboardButton::callback("📧 Email", "edit_email")],
        [InlineKeyboardButton::callback("👤 ФИО", "edit_fullname")],
        [InlineKeyboardButton::callback("👥 Пол", "edit_gender")],
        [InlineKeyboardButton::callback("✏️ Изменить все", "edit_all")],
        [InlineKeyboardButton::callback("◀️ Назад", "edit_back")],
    ])
}

pub fn own_profile() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        [InlineKeyboardButton::callback("✏️ Редактировать данные", "edit_profile")],
        [InlineKeyboardButton::callback("📅 Мои записи", "my_appointments")],
    ])
}

pub fn pending_request_actions(request_id: i64, user_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::callback("✅ Одобрить", format!("approve_request_{}", request_id)),
            InlineKeyboardButton::callback("❌ Отклонить", format!("reject_request_{}", request_id)),
        ],
        vec![
            InlineKeyboardButton::callback("💬 Комментарий", format!("comment_request_{}", request_id)),
            InlineKeyboardButton::callback("👤 Профиль", format!("view_user_{}", user_id)),
        ],
    ])
}

pub fn specific_request_actions(request_id: i64, user_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::callback("✅ Одобрить", format!("approve_request_{}", request_id)),
            InlineKeyboardButton::callback("❌ Отклонить", format!("reject_request_{}", request_id)),
        ],
        vec![
            InlineKeyboardButton::callback("💬 Комментарий", format!("comment_request_{}", request_id)),
            InlineKeyboardButton::callback("👤 Профиль", format!("view_user_{}", user_id)),
        ],
        vec![InlineKeyboardButton::callback(
            "◀️ Назад к списку заявок",
            "admin_view_requests",
        )],
    ])
}

pub fn new_request_notification(request_id: i64, user_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![InlineKeyboardButton::callback(
            "👤 Профиль пользователя",
            format!("view_user_{}", user_id),
        )],
        vec![InlineKeyboardButton::callback(
            "📝 Открыть заявку",
            format!("view_request_{}", request_id),
        )],
        vec![InlineKeyboardButton::url("✉️ Написать пользователю", contact_url(user_id))],
    ])
}

pub fn admin_user_profile(user_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::url("✉️ Написать", contact_url(user_id)),
            InlineKeyboardButton::callback("📝 Заявки", format!("user_appointments_{}", user_id)),
        ],
        vec![InlineKeyboardButton::callback("◀️ Назад", "back_to_admin_panel")],
    ])
}

pub fn statistics_exports() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        [InlineKeyboardButton::callback(
            "📊 Выгрузить статистику регистраций",
            "admin_statistics_registrations",
        )],
        [InlineKeyboardButton::callback(
            "📋 Выгрузить статистику заявок",
            "admin_statistics_appointments",
        )],
        [InlineKeyboardButton::callback("◀️ Назад", "back_to_admin_panel")],
    ])
}

fn contact_url(user_id: i64) -> Url {
    Url::parse(&format!("tg://user?id={}", user_id)).expect("static tg:// url is valid")
}
