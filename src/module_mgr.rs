#![doc(hidden)]

use anyhow::Error;
use teloxide::prelude::*;
use teloxide::types::BotCommand;

use crate::types::TeloxideHandler;

/// A bot command together with the handler serving it.
pub struct Command {
    pub command: String,
    pub description: String,
    pub handler: TeloxideHandler,
}

impl Command {
    pub fn new(command: &str, description: &str, handler: TeloxideHandler) -> Self {
        Self {
            command: command.to_owned(),
            description: description.to_owned(),
            handler,
        }
    }
}

#[async_trait]
pub trait Module {
    async fn register_dependency(&mut self, dep_map: &mut DependencyMap) -> Result<(), Error>;

    /// A handler chained in front of every business handler. It must
    /// continue the chain for messages it isn't interested in.
    fn filter_handler(&self) -> TeloxideHandler {
        dptree::entry()
    }

    /// The handler for updates that aren't commands.
    fn handler_chain(&self) -> TeloxideHandler {
        dptree::entry()
    }

    fn commands(&self) -> Vec<Command> {
        vec![]
    }
}

pub struct ModuleManager {
    modules: Vec<Box<dyn Module + Send + 'static>>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self { modules: vec![] }
    }

    pub fn register_module<C>(&mut self, module: C)
    where
        C: Module + Send + 'static,
    {
        self.modules.push(Box::new(module));
    }

    pub fn with_all_modules<F>(&self, mut f: F)
    where
        F: FnMut(&dyn Module),
    {
        for module in self.modules.iter() {
            f(module.as_ref());
        }
    }

    /// Lets every module insert its dependencies, in registration order.
    pub async fn register_dependencies(&mut self, dep_map: &mut DependencyMap) -> Result<(), Error> {
        for module in self.modules.iter_mut() {
            module.register_dependency(dep_map).await?;
        }
        Ok(())
    }

    /// Commands to be shown in the bot menu.
    pub fn bot_commands(&self) -> Vec<BotCommand> {
        let mut commands = vec![];
        self.with_all_modules(|m| {
            commands.extend(
                m.commands()
                    .into_iter()
                    .map(|c| BotCommand::new(c.command, c.description)),
            )
        });
        commands
    }
}
