use teloxide::prelude::*;
use teloxide::types::Me;

/// Builds a filter matching messages that invoke `cmd`.
pub fn command_filter(cmd: String) -> impl Fn(Message, Me) -> bool + Send + Sync + 'static {
    move |msg: Message, me: Me| {
        msg.text()
            .map(|text| is_command_for(text, &cmd, me.username()))
            .unwrap_or(false)
    }
}

/// Returns `true` if `text` starts with the `/cmd` command.
///
/// When sending commands in a group, a mention suffix may be attached to
/// the command. For example: "/help@xxxx_bot". Such commands only match
/// when the mentioned bot is us.
pub fn is_command_for(text: &str, cmd: &str, bot_username: &str) -> bool {
    let head = match text.split_whitespace().next() {
        Some(head) => head,
        None => return false,
    };
    let head = match head.strip_prefix('/') {
        Some(head) => head,
        None => return false,
    };

    match head.split_once('@') {
        Some((name, mention)) => name == cmd && mention.eq_ignore_ascii_case(bot_username),
        None => head == cmd,
    }
}

/// Returns `true` if `text` looks like a bot command of any kind.
pub fn is_command(text: &str) -> bool {
    text.starts_with('/')
}

/// Returns `true` if `text` is a command mentioning a bot other than us,
/// like "/stats@other_bot" in a group.
pub fn is_command_for_other_bot(text: &str, bot_username: &str) -> bool {
    let head = match text.split_whitespace().next() {
        Some(head) if is_command(head) => head,
        _ => return false,
    };
    match head.split_once('@') {
        Some((_, mention)) => !mention.eq_ignore_ascii_case(bot_username),
        None => false,
    }
}
