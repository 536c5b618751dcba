//! Configuration-related types.
//!
//! The configuration can be represented in and deserialized from JSON,
//! here is an example:
//!
//! ```json
//! {
//!   "openaiGptModel": "gpt-4",
//!   "maxTokens": 1000,
//!   "temperature": 0.7,
//!   "cooldownSeconds": 3,
//!   "systemPromptPath": "./system_prompt.txt",
//!   "knowledgeBasePath": "./knowledge_base.md",
//!   "i18n": {
//!     "apiErrorPrompt": "Something went wrong, please try again later."
//!   }
//! }
//! ```
//!
//! Credentials can be put in the same file (`botToken`, `openaiAPIKey`), but
//! it's recommended to pass them via the `TELEGRAM_BOT_TOKEN` and
//! `OPENAI_API_KEY` environment variables, which take precedence.
//!
//! See [`Config`] for more detailed descriptions.

use std::fs;
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error};
use paste::paste;
use serde::Deserialize;

/// Environment variable holding the Telegram bot token.
pub const TELEGRAM_BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// The config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// A thread-safe reference-counting object that represents
/// a [`Config`] instance.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    config: Arc<Config>,
}

impl SharedConfig {
    /// Constructs a new `SharedConfig`.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Deref for SharedConfig {
    type Target = Config;

    fn deref(&self) -> &Self::Target {
        self.config.as_ref()
    }
}

/// Top-level config type for the bot.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The API key of your OpenAI account.
    /// JSON key: `openaiAPIKey`, env: `OPENAI_API_KEY`
    #[serde(default, rename = "openaiAPIKey")]
    pub openai_api_key: String,
    /// The token of your Telegram bot.
    /// JSON key: `botToken`, env: `TELEGRAM_BOT_TOKEN`
    #[serde(default, rename = "botToken")]
    pub telegram_bot_token: String,

    /// The openai model your want to use in chat.
    /// Value is default to "gpt-4".
    /// JSON key: `openaiGptModel`
    #[serde(default = "default_openai_gpt_model", rename = "openaiGptModel")]
    pub openai_gpt_model: String,

    /// A timeout in seconds for waiting for the OpenAI server response.
    /// JSON key: `openaiAPITimeout`
    #[serde(default = "default_openai_api_timeout", rename = "openaiAPITimeout")]
    pub openai_api_timeout: u64,

    /// The maximum number of tokens allowed for the generated answer.
    /// JSON key: `maxTokens`
    #[serde(default = "default_max_tokens", rename = "maxTokens")]
    pub max_tokens: u16,

    /// Sampling temperature passed to the model, between 0 and 2.
    /// JSON key: `temperature`
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Minimum spacing (in seconds) between two accepted messages
    /// from the same user.
    /// JSON key: `cooldownSeconds`
    #[serde(default = "default_cooldown_seconds", rename = "cooldownSeconds")]
    pub cooldown_seconds: u64,

    /// When set, cooldown entries older than this many cooldown periods
    /// are dropped. [`None`] keeps every user for the process lifetime.
    /// JSON key: `cooldownRetention`
    #[serde(default, rename = "cooldownRetention")]
    pub cooldown_retention: Option<u32>,

    /// Maximum accepted length (in characters) of a user message.
    /// JSON key: `maxMessageLength`
    #[serde(default = "default_max_message_length", rename = "maxMessageLength")]
    pub max_message_length: usize,

    /// Whether to collect per-user statistics for the `/stats` command.
    /// JSON key: `enableStats`
    #[serde(default = "default_enable_stats", rename = "enableStats")]
    pub enable_stats: bool,

    /// Whether to show the "typing" action while waiting for the model.
    /// JSON key: `enableTypingIndicator`
    #[serde(
        default = "default_enable_typing_indicator",
        rename = "enableTypingIndicator"
    )]
    pub enable_typing_indicator: bool,

    /// Path of the system prompt file.
    /// JSON key: `systemPromptPath`
    #[serde(default = "default_system_prompt_path", rename = "systemPromptPath")]
    pub system_prompt_path: PathBuf,

    /// Path of the knowledge base file.
    /// JSON key: `knowledgeBasePath`
    #[serde(default = "default_knowledge_base_path", rename = "knowledgeBasePath")]
    pub knowledge_base_path: PathBuf,

    /// Strings for I18N.
    /// JSON key: `i18n`
    #[serde(default)]
    pub i18n: I18nStrings,
}

/// Strings for I18N.
#[derive(Debug, Clone, Deserialize)]
pub struct I18nStrings {
    /// A text to display when there are something wrong with the OpenAI service.
    /// JSON key: `apiErrorPrompt`
    #[serde(default = "default_api_error_prompt", rename = "apiErrorPrompt")]
    pub api_error_prompt: String,
    /// A text to display when the user is sending messages too fast.
    /// `{seconds}` is replaced with the remaining wait time.
    /// JSON key: `cooldownPrompt`
    #[serde(default = "default_cooldown_prompt", rename = "cooldownPrompt")]
    pub cooldown_prompt: String,
    /// A text to display when the message is too long.
    /// `{limit}` is replaced with the configured maximum length.
    /// JSON key: `messageTooLongPrompt`
    #[serde(
        default = "default_message_too_long_prompt",
        rename = "messageTooLongPrompt"
    )]
    pub message_too_long_prompt: String,
    /// A text to display when the message has no content to answer.
    /// JSON key: `emptyMessagePrompt`
    #[serde(default = "default_empty_message_prompt", rename = "emptyMessagePrompt")]
    pub empty_message_prompt: String,
    /// Reply of the `/start` command.
    /// JSON key: `startPrompt`
    #[serde(default = "default_start_prompt", rename = "startPrompt")]
    pub start_prompt: String,
    /// Reply of the `/help` command.
    /// JSON key: `helpPrompt`
    #[serde(default = "default_help_prompt", rename = "helpPrompt")]
    pub help_prompt: String,
    /// Reply of the `/about` command.
    /// JSON key: `aboutPrompt`
    #[serde(default = "default_about_prompt", rename = "aboutPrompt")]
    pub about_prompt: String,
    /// Reply of the `/stats` command when statistics are disabled.
    /// JSON key: `statsDisabledPrompt`
    #[serde(
        default = "default_stats_disabled_prompt",
        rename = "statsDisabledPrompt"
    )]
    pub stats_disabled_prompt: String,
    /// Reply of the `/stats` command when nothing is recorded yet.
    /// JSON key: `noStatsPrompt`
    #[serde(default = "default_no_stats_prompt", rename = "noStatsPrompt")]
    pub no_stats_prompt: String,
}

impl Config {
    /// Loads the config from `path`, or from [`DEFAULT_CONFIG_PATH`] if it
    /// exists. Credentials are then read from the environment.
    ///
    /// A missing file is only an error when the path is given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match fs::read_to_string(DEFAULT_CONFIG_PATH) {
                Ok(json) => {
                    info!("Configuration loaded from {}", DEFAULT_CONFIG_PATH);
                    Self::from_json(&json)
                        .with_context(|| format!("Invalid config file {}", DEFAULT_CONFIG_PATH))?
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    info!("{} not found, using default configuration", DEFAULT_CONFIG_PATH);
                    Self::from_json("{}")?
                }
                Err(err) => {
                    return Err(Error::new(err)
                        .context(format!("Failed to read {}", DEFAULT_CONFIG_PATH)))
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file.
    pub fn from_file<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json(&json)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Parses a config from its JSON representation, filling in defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Overrides the credentials with the values found by `lookup`.
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = lookup(TELEGRAM_BOT_TOKEN_ENV) {
            self.telegram_bot_token = token;
        }
        if let Some(key) = lookup(OPENAI_API_KEY_ENV) {
            self.openai_api_key = key;
        }
    }

    /// Checks that the bot can be started with this config.
    pub fn validate(&self) -> Result<(), Error> {
        if self.telegram_bot_token.trim().is_empty() {
            bail!("{} environment variable is required", TELEGRAM_BOT_TOKEN_ENV);
        }
        if self.openai_api_key.trim().is_empty() {
            bail!("{} environment variable is required", OPENAI_API_KEY_ENV);
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            );
        }
        if self.max_tokens == 0 {
            bail!("maxTokens must be greater than 0");
        }
        if self.openai_api_timeout == 0 {
            bail!("openaiAPITimeout must be greater than 0");
        }
        if self.max_message_length == 0 {
            bail!("maxMessageLength must be greater than 0");
        }
        if let Some(periods) = self.cooldown_retention {
            if periods == 0 {
                bail!("cooldownRetention must be at least 1");
            }
            if self.cooldown().checked_mul(periods).is_none() {
                bail!(
                    "cooldownRetention of {} cooldowns of {}s is too large",
                    periods,
                    self.cooldown_seconds
                );
            }
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    pub fn openai_timeout(&self) -> Duration {
        Duration::from_secs(self.openai_api_timeout)
    }
}

macro_rules! define_defaults {
    ($ty_name:ident { $($name:ident: $ty:ty = $default:expr,)* }) => {
        define_defaults! { $($name: $ty = $default,)* }
        paste! {
            impl Default for $ty_name {
                fn default() -> Self {
                    Self {
                        $($name: [<default_ $name>](),)*
                    }
                }
            }
        }
    };
    ($($name:ident: $ty:ty = $default:expr,)*) => {
        paste! {
            $(
                fn [<default_ $name>]() -> $ty {
                    $default
                }
            )*
        }
    };
}

define_defaults! {
    openai_gpt_model: String = "gpt-4".to_owned(),
    openai_api_timeout: u64 = 30,
    max_tokens: u16 = 1000,
    temperature: f32 = 0.7,
    cooldown_seconds: u64 = 3,
    max_message_length: usize = 4000,
    enable_stats: bool = true,
    enable_typing_indicator: bool = true,
    system_prompt_path: PathBuf = PathBuf::from("system_prompt.txt"),
    knowledge_base_path: PathBuf = PathBuf::from("knowledge_base.md"),
}

define_defaults!(I18nStrings {
    api_error_prompt: String = "\u{1F916} I apologize, but I'm experiencing some technical difficulties at the moment. Please try again in a few moments.".to_owned(),
    cooldown_prompt: String = "\u{23F0} Please wait {seconds} more second(s) between messages. This helps ensure quality responses for everyone.".to_owned(),
    message_too_long_prompt: String = "\u{26A0} Your message is too long. Please keep it under {limit} characters.".to_owned(),
    empty_message_prompt: String = "\u{26A0} Please send me a question as text.".to_owned(),
    start_prompt: String = "\u{1F916} Hello and welcome!

I'm your AI assistant, here to help you with questions, provide information, and assist with various tasks.

Available commands:
/start - Begin our conversation
/help - Show detailed help information
/about - Learn about this bot
/stats - Your interaction statistics

Simply send me any question or message, and I'll do my best to help you!".to_owned(),
    help_prompt: String = "\u{1F916} How to interact with your AI assistant:

\u{2022} Simply send me any text message with your question or request
\u{2022} Ask one question at a time for focused responses
\u{2022} Be as specific as possible for the best results
\u{2022} There's a brief cooldown between messages

Available commands:
/start - Welcome message and introduction
/help - Show this message
/about - Information about this bot
/stats - Your personal interaction statistics".to_owned(),
    about_prompt: String = "\u{1F916} About your AI assistant

I'm powered by OpenAI's language models and enhanced with a customizable knowledge base.

While I can provide information and assistance, critical decisions should always involve your own judgment.".to_owned(),
    stats_disabled_prompt: String = "\u{1F4CA} Statistics tracking is currently disabled.".to_owned(),
    no_stats_prompt: String = "\u{1F4CA} No statistics available yet. Start your journey by asking a question!".to_owned(),
});

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.openai_gpt_model, "gpt-4");
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.cooldown(), Duration::from_secs(3));
        assert_eq!(config.cooldown_retention, None);
        assert!(config.enable_stats);
        assert_eq!(config.system_prompt_path, PathBuf::from("system_prompt.txt"));
        assert!(config.i18n.cooldown_prompt.contains("{seconds}"));
    }

    #[test]
    fn json_overrides_defaults() {
        let config = Config::from_json(
            r#"{
                "openaiGptModel": "gpt-4o-mini",
                "maxTokens": 256,
                "temperature": 1.2,
                "cooldownSeconds": 10,
                "cooldownRetention": 4,
                "i18n": { "apiErrorPrompt": "oops" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.openai_gpt_model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.temperature, 1.2);
        assert_eq!(config.cooldown_seconds, 10);
        assert_eq!(config.cooldown_retention, Some(4));
        assert_eq!(config.i18n.api_error_prompt, "oops");
        // Untouched i18n keys keep their defaults.
        assert_eq!(
            config.i18n.no_stats_prompt,
            I18nStrings::default().no_stats_prompt
        );
    }

    #[test]
    fn env_credentials_take_precedence() {
        let mut config =
            Config::from_json(r#"{"botToken": "file-token", "openaiAPIKey": "file-key"}"#)
                .unwrap();
        config.apply_env(env_of(&[(TELEGRAM_BOT_TOKEN_ENV, "env-token")]));
        assert_eq!(config.telegram_bot_token, "env-token");
        assert_eq!(config.openai_api_key, "file-key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_credentials_are_fatal() {
        let mut config = Config::from_json("{}").unwrap();
        config.apply_env(env_of(&[(OPENAI_API_KEY_ENV, "sk-test")]));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(TELEGRAM_BOT_TOKEN_ENV));

        config.apply_env(env_of(&[(TELEGRAM_BOT_TOKEN_ENV, "   ")]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let mut config = Config::from_json(r#"{"temperature": 3.5}"#).unwrap();
        config.apply_env(env_of(&[
            (TELEGRAM_BOT_TOKEN_ENV, "token"),
            (OPENAI_API_KEY_ENV, "key"),
        ]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_cooldown_retention_is_rejected() {
        let mut config = Config::from_json(
            r#"{"cooldownSeconds": 10000000000000000000, "cooldownRetention": 2}"#,
        )
        .unwrap();
        config.apply_env(env_of(&[
            (TELEGRAM_BOT_TOKEN_ENV, "token"),
            (OPENAI_API_KEY_ENV, "key"),
        ]));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cooldownRetention"));

        config.cooldown_retention = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(Config::from_file(&missing).is_err());

        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{"cooldownSeconds": 5}}"#).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.cooldown_seconds, 5);
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::from_file(&path).is_err());
    }
}
