#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use telekb_core::{
    app,
    config::{Config, SharedConfig},
};

/// An AI assistant bot for Telegram, backed by OpenAI and a knowledge base.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path of the JSON config file. Defaults to `config.json` if it exists.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the system prompt file path.
    #[arg(long)]
    system_prompt: Option<PathBuf>,

    /// Overrides the knowledge base file path.
    #[arg(long)]
    knowledge_base: Option<PathBuf>,
}

fn load_config(args: Args) -> Result<Config, anyhow::Error> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(path) = args.system_prompt {
        config.system_prompt_path = path;
    }
    if let Some(path) = args.knowledge_base {
        config.knowledge_base_path = path;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut logger = pretty_env_logger::formatted_timed_builder();
    logger.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let args = Args::parse();
    match dotenvy::dotenv() {
        Ok(path) => info!("Environment loaded from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("Failed to load .env file: {}", err),
    }

    info!("Bot is starting...");
    let config = match load_config(args) {
        Ok(config) => config,
        Err(err) => {
            error!("Failed to load config: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = app::run(SharedConfig::new(config)).await {
        error!("Failed to start bot: {:#}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
