#![allow(clippy::too_many_arguments)]

use anyhow::Error;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, Me};

use crate::{
    config::SharedConfig,
    module_mgr::Module,
    modules::admission::{cooldown_notice, Admission, AdmissionGate},
    modules::openai::{ChatModel, SharedChatModel},
    modules::prompt::PromptContext,
    types::{HandlerResult, TeloxideHandler},
    utils::{dptree_ext, ellipsize},
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct MessageText(String);

/// Removes a leading `@bot` mention to prevent the model from being
/// affected by it. The mention has to be followed by whitespace or end the
/// message, so `@bot2` is left alone.
fn strip_mention(text: &str, bot_username: &str) -> String {
    let trimmed_text = text.trim_start();
    if let Some(text_without_at) = trimmed_text.strip_prefix('@') {
        if let Some(name) = text_without_at.get(..bot_username.len()) {
            let rest = &text_without_at[bot_username.len()..];
            if name.eq_ignore_ascii_case(bot_username)
                && (rest.is_empty() || rest.starts_with(char::is_whitespace))
            {
                return rest.trim().to_owned();
            }
        }
    }
    text.trim().to_owned()
}

/// Picks the messages answered by the model. Commands are served by other
/// modules, unknown ones are dropped.
fn chat_text(msg: &Message) -> Option<MessageText> {
    plain_text(msg.text()?)
}

fn plain_text(text: &str) -> Option<MessageText> {
    if dptree_ext::is_command(text) {
        None
    } else {
        Some(MessageText(text.to_owned()))
    }
}

/// Validates the message and consults the admission gate. On refusal,
/// returns the notice to send back to the user.
///
/// Invalid messages are refused before reaching the gate, so they don't
/// start a cooldown.
pub(crate) fn admit_message(
    user_id: u64,
    text: &str,
    gate: &AdmissionGate,
    config: &SharedConfig,
) -> Result<(), String> {
    if text.is_empty() {
        return Err(config.i18n.empty_message_prompt.clone());
    }

    let length = text.chars().count();
    if length > config.max_message_length {
        warn!(
            "Message from user {} is too long ({} > {})",
            user_id, length, config.max_message_length
        );
        return Err(config
            .i18n
            .message_too_long_prompt
            .replace("{limit}", &config.max_message_length.to_string()));
    }

    match gate.check(user_id) {
        Admission::Accept => {
            debug!("User {} is admitted, {} users tracked", user_id, gate.tracked_users());
            Ok(())
        }
        Admission::Reject { remaining } => {
            info!(
                "User {} is rate limited, {}ms remaining",
                user_id,
                remaining.as_millis()
            );
            Err(cooldown_notice(config, remaining))
        }
    }
}

/// Asks the model to answer `text`. Any failure is logged and turned into
/// the generic error prompt, so the returned text can always be sent.
pub(crate) async fn request_answer(
    user_id: u64,
    text: &str,
    prompt: &PromptContext,
    model: &dyn ChatModel,
    config: &SharedConfig,
) -> String {
    match try_request_answer(user_id, text, prompt, model, config).await {
        Ok(answer) => answer,
        Err(err) => {
            error!("OpenAI API error for user {}: {:#}", user_id, err);
            config.i18n.api_error_prompt.clone()
        }
    }
}

async fn try_request_answer(
    user_id: u64,
    text: &str,
    prompt: &PromptContext,
    model: &dyn ChatModel,
    config: &SharedConfig,
) -> Result<String, Error> {
    let msgs = prompt.build_messages(text)?;

    info!(
        "Making OpenAI API call for user {}, message: {}",
        user_id,
        ellipsize(text, 50)
    );
    let timeout = config.openai_timeout();
    let result = tokio::time::timeout(timeout, model.request_chat_model(msgs))
        .await
        .map_err(|_| anyhow!("Request is timeout after {}s", timeout.as_secs()))??;

    info!(
        "OpenAI API call successful for user {} ({} tokens)",
        user_id, result.token_usage
    );
    Ok(result.content)
}

async fn handle_chat_message(
    bot: Bot,
    me: Me,
    msg: Message,
    text: MessageText,
    gate: AdmissionGate,
    prompt: PromptContext,
    model: SharedChatModel,
    config: SharedConfig,
) -> HandlerResult {
    let user_id = match msg.from() {
        Some(user) => user.id.0,
        None => {
            warn!("Message ({}) has no sender, ignored", msg.id.0);
            return Ok(());
        }
    };
    let text = strip_mention(&text.0, me.username());

    if let Err(notice) = admit_message(user_id, &text, &gate, &config) {
        bot.send_message(msg.chat.id, notice)
            .reply_to_message_id(msg.id)
            .await?;
        return Ok(());
    }

    if config.enable_typing_indicator {
        if let Err(err) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
            warn!("Failed to send typing action: {}", err);
        }
    }

    let answer = request_answer(user_id, &text, &prompt, model.as_ref(), &config).await;
    bot.send_message(msg.chat.id, answer)
        .reply_to_message_id(msg.id)
        .await?;
    info!("Response sent to user {}", user_id);

    Ok(())
}

/// Answers plain text messages with the chat model.
pub(crate) struct Chat;

#[async_trait]
impl Module for Chat {
    async fn register_dependency(&mut self, _dep_map: &mut DependencyMap) -> Result<(), Error> {
        Ok(())
    }

    fn handler_chain(&self) -> TeloxideHandler {
        dptree::filter_map(|msg: Message| chat_text(&msg)).endpoint(handle_chat_message)
    }
}
