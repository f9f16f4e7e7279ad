use std::sync::OnceLock;

use teloxide::types::UserId;

use crate::error::{BotError, BotResult};

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    pub admin: AdminConfig,
    pub vision: VisionConfig,
    pub broadcast: BroadcastConfig,
}

impl AppConfig {
    pub fn set_global(config: AppConfig) -> BotResult<()> {
        APP_CONFIG
            .set(config)
            .map_err(|_| BotError::AppState("Failed to set global app config".to_string()))
    }

    pub fn get() -> BotResult<&'static AppConfig> {
        APP_CONFIG
            .get()
            .ok_or_else(|| BotError::AppState("App config not initialized".to_string()))
    }
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub token: String,
    /// Bot username without the leading '@', used to build referral links.
    pub bot_username: String,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Clone, Debug)]
pub struct AdminConfig {
    /// Static allow-list; merged with the users.is_admin flag at check time.
    pub user_ids: Vec<UserId>,
}

#[derive(Clone, Debug)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct BroadcastConfig {
    /// Users with activity within this many days count as broadcast recipients.
    pub active_window_days: u32,
}

pub fn build_config() -> BotResult<AppConfig> {
    info!("Building AppConfig...");

    let config = AppConfig {
        telegram: TelegramConfig {
            token: require("TELEGRAM_BOT_TOKEN")?,
            bot_username: std::env::var("BOT_USERNAME").unwrap_or_else(|_| "umodnobot".to_string()),
        },
        database: DatabaseConfig {
            path: std::env::var("DATABASE_PATH").unwrap_or_else(|_| "users.db".to_string()),
        },
        admin: AdminConfig {
            user_ids: parse_admin_ids(&require("ADMIN_TELEGRAM_USER_IDS")?)?,
        },
        vision: VisionConfig {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        },
        broadcast: BroadcastConfig {
            active_window_days: std::env::var("BROADCAST_ACTIVE_WINDOW_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        },
    };

    info!("AppConfig built");

    Ok(config)
}

fn require(key: &str) -> BotResult<String> {
    std::env::var(key).map_err(|_| BotError::Config(format!("Missing {}", key)))
}

fn parse_admin_ids(raw: &str) -> BotResult<Vec<UserId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map(UserId)
                .map_err(|_| BotError::Config(format!("Invalid admin id: {}", s)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_admin_ids() {
        let ids = parse_admin_ids("1301142907, 987654321,555555555").unwrap();
        assert_eq!(ids, vec![UserId(1301142907), UserId(987654321), UserId(555555555)]);
    }

    #[test]
    fn rejects_garbage_admin_ids() {
        assert!(parse_admin_ids("abc").is_err());
    }
}
