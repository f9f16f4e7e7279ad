use teloxide::prelude::*;

use crate::config::{build_config, AppConfig};
use crate::error::BotResult;
use crate::handlers::handler_tree;
use crate::services::dialogue::DialogueService;
use crate::state::AppState;

pub struct BotService {
    pub bot: Bot,
}

impl BotService {
    pub async fn new() -> BotResult<Self> {
        info!("Initializing AppState...");
        let config = build_config()?;
        AppConfig::set_global(config.clone())?;

        let state = AppState::new(&config).await?;
        AppState::set_global(state)?;
        info!("AppState initialized");

        Ok(Self {
            bot: Bot::new(config.telegram.token.clone()),
        })
    }

    pub async fn start(&self) -> BotResult<()> {
        info!("Testing connection to Telegram API...");
        match self.bot.get_me().await {
            Ok(me) => info!("Connected to Telegram API as @{}", me.username()),
            Err(e) => {
                error!("Failed to connect to Telegram API: {:?}", e);
                return Err(anyhow::anyhow!("Failed to connect to Telegram API: {}", e).into());
            }
        }

        crate::command::setup_commands(&self.bot).await?;

        let storage = DialogueService::storage();

        Dispatcher::builder(self.bot.clone(), handler_tree())
            .dependencies(dptree::deps![storage])
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}
