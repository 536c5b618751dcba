use anyhow::Error;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;

use crate::module_mgr::ModuleManager;
use crate::types::{HandlerResult, TeloxideDispatcher};
use crate::utils::{dptree_ext::command_filter, ellipsize};

async fn message_filter(msg: Message) -> bool {
    let from = msg
        .from()
        .map(|u| {
            let full_name = u.full_name();
            if full_name.is_empty() {
                u.id.to_string()
            } else {
                format!("{} ({})", full_name, u.id)
            }
        })
        .unwrap_or("<unknown>".to_owned());

    if let Some(text) = msg.text() {
        info!("{} sent a message: {}", from, ellipsize(text, 100));
    } else {
        info!("{} sent a non-text message", from);
    }

    true
}

async fn default_handler(msg: Message) -> HandlerResult {
    warn!("Message ({}) is not handled!", msg.id.0);
    Ok(())
}

pub(crate) async fn build_dispatcher(
    bot: Bot,
    mut module_mgr: ModuleManager,
) -> Result<TeloxideDispatcher, Error> {
    // Load dependencies.
    let mut dep_map = DependencyMap::new();
    module_mgr.register_dependencies(&mut dep_map).await?;

    // Build handler chain.
    let mut filter_handlers = vec![];
    let mut command_handlers = vec![];
    let mut biz_handlers = vec![];
    module_mgr.with_all_modules(|m| {
        filter_handlers.push(m.filter_handler());
        for cmd in m.commands() {
            command_handlers.push(dptree::filter(command_filter(cmd.command)).chain(cmd.handler));
        }
        biz_handlers.push(m.handler_chain());
    });

    let mut handler = Update::filter_message().chain(dptree::filter_async(message_filter));
    for filter in filter_handlers {
        handler = handler.chain(filter);
    }
    let mut biz_handler = dptree::entry();
    for h in command_handlers.into_iter().chain(biz_handlers) {
        biz_handler = biz_handler.branch(h);
    }
    let handler = handler.chain(biz_handler.branch(dptree::endpoint(default_handler)));

    Ok(Dispatcher::builder(bot, handler)
        .dependencies(dep_map)
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred while handling an update",
        ))
        .enable_ctrlc_handler()
        .build())
}
