use teloxide::dispatching::dialogue::Dialogue;
use teloxide::dptree;
use teloxide_tests::{MockBot, MockMessageText};
use tokio::sync::{Mutex, MutexGuard};

use crate::config::{
    AdminConfig, AppConfig, BroadcastConfig, DatabaseConfig, TelegramConfig, VisionConfig,
};
use crate::handlers::handler_tree;
use crate::services::dialogue::{BotDialogue, DialogueService, DialogueState};
use crate::services::profile::{Gender, RegistrationStep};
use crate::state::AppState;

static TEST_MUTEX: Mutex<()> = Mutex::const_new(());

/// The app config and state are process-wide globals, so the dispatch tests
/// share one database and run serialized.
async fn setup() -> MutexGuard<'static, ()> {
    let guard = TEST_MUTEX.lock().await;
    if AppState::get().is_err() {
        let config = AppConfig {
            telegram: TelegramConfig {
                token: "123456:TEST".to_string(),
                bot_username: "umodnobot".to_string(),
            },
            database: DatabaseConfig {
                path: crate::storage::temp_db_path(),
            },
            admin: AdminConfig { user_ids: vec![] },
            vision: VisionConfig {
                api_key: None,
                api_url: "https://api.openai.com/v1/chat/completions".to_string(),
                model: "gpt-4o-mini".to_string(),
            },
            broadcast: BroadcastConfig {
                active_window_days: 30,
            },
        };
        AppConfig::set_global(config.clone()).ok();
        let state = AppState::new(&config).await.expect("failed to build app state");
        AppState::set_global(state).ok();
    }
    guard
}

fn last_text(bot: &MockBot) -> Option<String> {
    bot.get_responses()
        .sent_messages
        .last()
        .and_then(|m| m.text().map(str::to_string))
}

#[tokio::test]
async fn back_to_menu_is_idempotent() {
    let _guard = setup().await;

    let bot = MockBot::new(MockMessageText::new().text("◀️ Назад в меню"), handler_tree());
    bot.dependencies(dptree::deps![DialogueService::storage()]);

    bot.dispatch().await;
    assert_eq!(last_text(&bot).as_deref(), Some("Выберите действие:"));

    // Pressing it again while already idle must behave identically.
    bot.update(MockMessageText::new().text("◀️ Назад в меню"));
    bot.dispatch().await;
    assert_eq!(last_text(&bot).as_deref(), Some("Выберите действие:"));
}

#[tokio::test]
async fn registration_walks_every_step_to_completion() {
    let _guard = setup().await;
    let state = AppState::get().unwrap();

    let bot = MockBot::new(MockMessageText::new().text("/start"), handler_tree());
    bot.dependencies(dptree::deps![DialogueService::storage()]);

    bot.dispatch().await;
    let welcome = last_text(&bot).expect("no welcome message");
    assert!(welcome.starts_with("Добро пожаловать в бот стоматологической клиники!"));

    bot.update(MockMessageText::new().text("+79991234567"));
    bot.dispatch().await;
    assert_eq!(
        last_text(&bot).as_deref(),
        Some("Спасибо! Теперь введите вашу дату рождения в формате ДД.ММ.ГГГГ:")
    );

    let user_id = state
        .profiles
        .find_by_phone("+79991234567")
        .await
        .unwrap()
        .expect("no registration record")
        .telegram_id;

    bot.update(MockMessageText::new().text("01.01.1990"));
    bot.dispatch().await;
    assert_eq!(
        last_text(&bot).as_deref(),
        Some("Введите ваш email или нажмите «⏭️ Пропустить»:")
    );

    bot.update(MockMessageText::new().text("⏭️ Пропустить"));
    bot.dispatch().await;
    assert_eq!(last_text(&bot).as_deref(), Some("Укажите ваш пол:"));

    // Gender is picked on the inline keyboard, not typed.
    state.profiles.set_gender(user_id, Gender::Male).await.unwrap();
    state.profiles.set_step(user_id, RegistrationStep::FullName).await.unwrap();

    bot.update(MockMessageText::new().text("Иванов Иван Иванович"));
    bot.dispatch().await;
    assert_eq!(
        last_text(&bot).as_deref(),
        Some("✅ Регистрация успешно завершена!\n\nТеперь вам доступны все функции бота.")
    );

    let user = state.profiles.get(user_id).await.unwrap().unwrap();
    assert!(user.is_completed());
    assert_eq!(user.phone.as_deref(), Some("+79991234567"));
    assert!(user.email.is_none());
}

#[tokio::test]
async fn cancel_during_decision_returns_to_pending_list() {
    let _guard = setup().await;
    let storage = DialogueService::storage();

    let bot = MockBot::new(MockMessageText::new().text("◀️ Назад в меню"), handler_tree());
    bot.dependencies(dptree::deps![storage.clone()]);

    bot.dispatch().await;
    let chat_id = bot
        .get_responses()
        .sent_messages
        .last()
        .expect("no response")
        .chat
        .id;

    let dialogue: BotDialogue = Dialogue::new(storage, chat_id);
    dialogue
        .update(DialogueState::AwaitingDecisionDate { request_id: 1 })
        .await
        .unwrap();

    bot.update(MockMessageText::new().text("◀️ Отменить"));
    bot.dispatch().await;
    assert_eq!(last_text(&bot).as_deref(), Some("Нет ожидающих заявок."));
}
