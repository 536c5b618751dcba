use anyhow::Error;
use teloxide::prelude::*;

use crate::{
    config::{I18nStrings, SharedConfig},
    module_mgr::{Command, Module},
    types::TeloxideHandler,
};

/// Builds an endpoint replying with a static text picked from the config.
fn reply_with(
    name: &'static str,
    pick: fn(&I18nStrings) -> &String,
) -> TeloxideHandler {
    dptree::endpoint(move |bot: Bot, msg: Message, config: SharedConfig| async move {
        if let Some(user) = msg.from() {
            info!("{} command from user {}", name, user.id);
        }
        bot.send_message(msg.chat.id, pick(&config.i18n)).await?;
        Ok::<(), Error>(())
    })
}

/// Informational commands: `/start`, `/help` and `/about`.
pub(crate) struct Help;

#[async_trait]
impl Module for Help {
    async fn register_dependency(&mut self, _dep_map: &mut DependencyMap) -> Result<(), Error> {
        Ok(())
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new(
                "start",
                "Start using the AI assistant",
                reply_with("Start", |i18n| &i18n.start_prompt),
            ),
            Command::new(
                "help",
                "Get help and usage instructions",
                reply_with("Help", |i18n| &i18n.help_prompt),
            ),
            Command::new(
                "about",
                "Learn about this AI assistant",
                reply_with("About", |i18n| &i18n.about_prompt),
            ),
        ]
    }
}
