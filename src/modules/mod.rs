pub(crate) mod admission;
pub(crate) mod chat;
pub(crate) mod config;
pub(crate) mod help;
pub(crate) mod openai;
pub(crate) mod prompt;
pub(crate) mod stats;
