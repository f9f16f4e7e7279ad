use bot::BotService;

extern crate pretty_env_logger;
#[macro_use]
extern crate log;

mod bot;
mod command;
mod config;
mod error;
mod handlers;
mod services;
mod state;
mod storage;
#[cfg(test)]
mod tests;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = pretty_env_logger::try_init_timed();

    info!("Starting bot...");

    let bot_service = BotService::new().await?;

    info!("Bot instance created");

    bot_service.start().await?;

    Ok(())
}
