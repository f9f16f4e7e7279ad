use teloxide::RequestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] RequestError),

    #[error("Profile is incomplete")]
    ProfileIncomplete,

    #[error("Request not found: {0}")]
    RequestNotFound(i64),

    #[error("Request already processed: {0}")]
    RequestAlreadyProcessed(i64),

    #[error("No user with phone {0}")]
    TargetNotFound(String),

    #[error("Insufficient balance: {balance}")]
    InsufficientBalance { balance: i64 },

    #[error("Vision API error: {0}")]
    Vision(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("App state error: {0}")]
    AppState(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type BotResult<T> = Result<T, BotError>;

/// Endpoint result type expected by the teloxide dispatcher.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
