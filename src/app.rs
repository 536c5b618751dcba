//! Entry point for running the bot inside your own process.
//!
//! ```no_run
//! use telekb_core::config::{Config, SharedConfig};
//!
//! # async fn serve() -> anyhow::Result<()> {
//! let config = Config::load(None)?;
//! telekb_core::app::run(SharedConfig::new(config)).await
//! # }
//! ```

use anyhow::Error;
use teloxide::{prelude::*, types::BotCommand, types::MenuButton};

use crate::{
    config::SharedConfig,
    dispatcher::build_dispatcher,
    module_mgr::ModuleManager,
    modules::{
        admission::Cooldown, chat::Chat, help::Help, openai::OpenAI, prompt::Prompt, stats::Stats,
    },
};

async fn update_menu(bot: &Bot, commands: Vec<BotCommand>) -> Result<(), Error> {
    bot.set_my_commands(commands).await?;
    bot.set_chat_menu_button()
        .menu_button(MenuButton::Commands)
        .await?;
    Ok(())
}

fn init_modules(config: SharedConfig) -> ModuleManager {
    // The config module goes first, the others read it.
    let mut module_mgr = ModuleManager::new();
    module_mgr.register_module(crate::modules::config::Config::new(config));
    module_mgr.register_module(Prompt);
    module_mgr.register_module(OpenAI);
    module_mgr.register_module(Cooldown);
    module_mgr.register_module(Help);
    module_mgr.register_module(Stats);
    module_mgr.register_module(Chat);
    module_mgr
}

/// Serves the bot until the process receives Ctrl-C.
///
/// Returns early with an error if the bot can't be initialized, for
/// example when the Telegram token is rejected.
pub async fn run(config: SharedConfig) -> Result<(), Error> {
    config.validate()?;

    debug!("Initializing modules...");
    let module_mgr = init_modules(config.clone());
    let commands = module_mgr.bot_commands();

    info!("Initializing bot...");
    let bot = Bot::new(&config.telegram_bot_token);
    let mut dispatcher = build_dispatcher(bot.clone(), module_mgr).await?;
    update_menu(&bot, commands)
        .await
        .map_err(|err| err.context("Failed to init bot"))?;

    info!("Bot is started!");
    dispatcher.dispatch().await;
    info!("Bot is stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn menu_lists_every_command() {
        let config = SharedConfig::new(Config::from_json("{}").unwrap());
        let commands: Vec<_> = init_modules(config)
            .bot_commands()
            .into_iter()
            .map(|c| c.command)
            .collect();
        assert_eq!(commands, ["start", "help", "about", "stats"]);
    }
}
