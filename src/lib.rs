//! A knowledge-base backed AI assistant bot for Telegram.
//!
//! TeleKB is a Telegram bot based on [`teloxide`](https://docs.rs/teloxide/latest/teloxide/)
//! framework and [`async_openai`](https://docs.rs/async-openai/latest/async_openai/). Every
//! text message is answered by an OpenAI chat model, primed with a system prompt and an
//! optional knowledge base loaded from plain text files.
//!
//! ## Getting Started
//!
//! ### Using via CLI
//!
//! TeleKB features a single-binary executable, you can serve the bot by simply running the
//! command below:
//!
//! ```shell
//! $ export TELEGRAM_BOT_TOKEN=... OPENAI_API_KEY=...
//! $ /path/to/telekb -c your_config.json
//! ```
//!
//! The configuration is described in [`config`] module. Both credentials can also be
//! put in a `.env` file in the working directory.
//!
//! ### Using via library
//!
//! TeleKB can also be used as a library, therefore you can run it along with your code in
//! the same process. Checkout the [`app`] module to learn more about it.
//!
//! ## Rate limiting
//!
//! Each user has to wait for a configurable cooldown between two answered messages.
//! Messages arriving during the cooldown are answered with a notice carrying the
//! remaining wait time, and never reach the OpenAI API.
//!
//! ## Logging
//!
//! Logs are written to stderr at `info` level. Set `RUST_LOG` (for example
//! `RUST_LOG=telekb_core=debug`) to change it. Nothing is written to a log file,
//! redirect stderr if you need one.

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate async_trait;

pub mod app;
pub mod config;
mod dispatcher;
mod module_mgr;
mod modules;
mod types;
mod utils;
