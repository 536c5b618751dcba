mod stats_mgr;

use anyhow::Error;
use chrono::{DateTime, Local};
use teloxide::prelude::*;
use teloxide::types::Me;
use tokio::time::Instant;

use crate::{
    config::SharedConfig,
    module_mgr::{Command, Module},
    modules::admission::{AdmissionGate, CooldownState},
    types::{HandlerResult, TeloxideHandler},
    utils::dptree_ext,
};
pub(crate) use stats_mgr::{StatsManager, UserStats};

pub(crate) fn format_user_stats(
    stats: &UserStats,
    cooldown: CooldownState,
    now: DateTime<Local>,
) -> String {
    let cooldown = match cooldown {
        CooldownState::Idle => "ready".to_owned(),
        CooldownState::Cooling { remaining } => {
            format!("{:.1}s remaining", remaining.as_secs_f64())
        }
    };
    format!(
        "\u{1F4CA} Your AI Assistant Statistics

\u{2022} First interaction: {}
\u{2022} Last interaction: {}
\u{2022} Days active: {}
\u{2022} Total messages: {}
\u{2022} Username: @{}
\u{2022} Cooldown: {}",
        stats.first_interaction.format("%B %d, %Y"),
        stats.last_interaction.format("%B %d, %Y %H:%M"),
        stats.days_active(now),
        stats.message_count,
        stats.username.as_deref().unwrap_or("Unknown"),
        cooldown,
    )
}

/// Whether a message counts as an interaction. Commands addressed to other
/// bots in a group are ignored like the command router does.
fn should_record(enable_stats: bool, text: Option<&str>, bot_username: &str) -> bool {
    match text {
        Some(text) => enable_stats && !dptree_ext::is_command_for_other_bot(text, bot_username),
        None => false,
    }
}

/// Never filters anything out, it only counts the message.
fn record_interaction(
    msg: Message,
    me: Me,
    stats_mgr: StatsManager,
    config: SharedConfig,
) -> bool {
    if should_record(config.enable_stats, msg.text(), me.username()) {
        if let Some(user) = msg.from() {
            stats_mgr.record_interaction(user.id.0, user.username.as_deref());
        }
    }
    true
}

async fn show_stats(
    bot: Bot,
    msg: Message,
    stats_mgr: StatsManager,
    gate: AdmissionGate,
    config: SharedConfig,
) -> HandlerResult {
    let reply = if !config.enable_stats {
        config.i18n.stats_disabled_prompt.clone()
    } else {
        msg.from()
            .and_then(|user| {
                let stats = stats_mgr.get_user_stats(user.id.0)?;
                let cooldown = gate.state_at(user.id.0, Instant::now());
                Some(format_user_stats(&stats, cooldown, Local::now()))
            })
            .unwrap_or_else(|| config.i18n.no_stats_prompt.clone())
    };

    bot.send_message(msg.chat.id, reply)
        .reply_to_message_id(msg.id)
        .await?;
    Ok(())
}

pub(crate) struct Stats;

#[async_trait]
impl Module for Stats {
    async fn register_dependency(&mut self, dep_map: &mut DependencyMap) -> Result<(), Error> {
        dep_map.insert(StatsManager::new());
        Ok(())
    }

    fn filter_handler(&self) -> TeloxideHandler {
        dptree::filter(record_interaction)
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new(
            "stats",
            "View your interaction statistics",
            dptree::endpoint(show_stats),
        )]
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn formats_stats_report() {
        let first = Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let now = Local.with_ymd_and_hms(2024, 3, 5, 18, 0, 0).unwrap();
        let stats = UserStats {
            username: Some("alice".to_owned()),
            first_interaction: first,
            last_interaction: now,
            message_count: 12,
        };

        let report = format_user_stats(&stats, CooldownState::Idle, now);
        assert!(report.contains("First interaction: March 01, 2024"));
        assert!(report.contains("Last interaction: March 05, 2024 18:00"));
        assert!(report.contains("Days active: 5"));
        assert!(report.contains("Total messages: 12"));
        assert!(report.contains("Username: @alice"));
        assert!(report.contains("Cooldown: ready"));
    }

    #[test]
    fn records_text_messages_when_enabled() {
        assert!(should_record(true, Some("hello"), "kb_bot"));
        assert!(should_record(true, Some("/stats"), "kb_bot"));
        assert!(should_record(true, Some("/stats@kb_bot"), "kb_bot"));
        assert!(should_record(true, Some("/unknown"), "kb_bot"));
    }

    #[test]
    fn skips_disabled_stats_and_non_text() {
        assert!(!should_record(false, Some("hello"), "kb_bot"));
        assert!(!should_record(false, Some("/stats"), "kb_bot"));
        assert!(!should_record(true, None, "kb_bot"));
    }

    #[test]
    fn skips_commands_for_other_bots() {
        assert!(!should_record(true, Some("/stats@other_bot"), "kb_bot"));
        assert!(!should_record(true, Some("/help@other_bot please"), "kb_bot"));
    }

    #[test]
    fn unknown_username_is_reported() {
        let now = Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let stats = UserStats {
            username: None,
            first_interaction: now,
            last_interaction: now,
            message_count: 1,
        };
        let cooldown = CooldownState::Cooling {
            remaining: Duration::from_millis(1500),
        };
        let report = format_user_stats(&stats, cooldown, now);
        assert!(report.contains("Username: @Unknown"));
        assert!(report.contains("Cooldown: 1.5s remaining"));
    }
}
