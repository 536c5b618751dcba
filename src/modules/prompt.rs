use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use anyhow::Error;
use async_openai::types::{ChatCompletionRequestMessage, ChatCompletionRequestMessageArgs, Role};
use teloxide::dptree::di::DependencySupplier;
use teloxide::prelude::*;

use crate::{config::SharedConfig, module_mgr::Module};

pub(crate) const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, knowledgeable AI assistant designed to provide thoughtful and accurate responses to user questions. You are friendly, professional, and adaptable to different conversation styles and topics.

Your responses should be:
- Clear and informative
- Helpful and supportive
- Professional yet approachable
- Tailored to the user's level of understanding
- Respectful and inclusive

When someone asks you a question, provide accurate and relevant information while maintaining a consistent and reliable personality. Be honest about your limitations and suggest ways users might find additional information when needed.";

/// The static context sent along with every user message.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PromptContext {
    system_prompt: Arc<str>,
    knowledge_base: Option<Arc<str>>,
}

impl PromptContext {
    pub fn new<S>(system_prompt: S, knowledge_base: Option<String>) -> Self
    where
        S: Into<String>,
    {
        Self {
            system_prompt: Arc::from(system_prompt.into()),
            knowledge_base: knowledge_base.map(Arc::from),
        }
    }

    /// Reads the system prompt and the knowledge base files. Missing or
    /// unreadable files are logged and replaced by their defaults.
    pub fn load(system_prompt_path: &Path, knowledge_base_path: &Path) -> Self {
        Self::new(
            load_system_prompt(system_prompt_path),
            load_knowledge_base(knowledge_base_path),
        )
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn knowledge_base(&self) -> Option<&str> {
        self.knowledge_base.as_deref()
    }

    /// The content of the user message actually sent to the model.
    pub fn user_payload(&self, text: &str) -> String {
        match self.knowledge_base() {
            Some(knowledge) => format!(
                "Additional context and knowledge:\n{}\n\nUser question: {}",
                knowledge, text
            ),
            None => text.to_owned(),
        }
    }

    pub fn build_messages(&self, text: &str) -> Result<Vec<ChatCompletionRequestMessage>, Error> {
        let system_msg = ChatCompletionRequestMessageArgs::default()
            .role(Role::System)
            .content(self.system_prompt())
            .build()?;
        let user_msg = ChatCompletionRequestMessageArgs::default()
            .role(Role::User)
            .content(self.user_payload(text))
            .build()?;
        Ok(vec![system_msg, user_msg])
    }
}

fn read_trimmed(path: &Path) -> Result<String, std::io::Error> {
    Ok(fs::read_to_string(path)?.trim().to_owned())
}

fn load_system_prompt(path: &Path) -> String {
    match read_trimmed(path) {
        Ok(prompt) if prompt.is_empty() => {
            warn!("{} is empty, using default prompt", path.display());
        }
        Ok(prompt) => {
            info!("System prompt loaded from {}", path.display());
            return prompt;
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("{} not found, using default prompt", path.display());
        }
        Err(err) => {
            error!("Error loading system prompt: {}", err);
        }
    }
    DEFAULT_SYSTEM_PROMPT.to_owned()
}

fn load_knowledge_base(path: &Path) -> Option<String> {
    match read_trimmed(path) {
        Ok(knowledge) if knowledge.is_empty() => {
            info!("{} is empty, continuing without knowledge base", path.display());
            None
        }
        Ok(knowledge) => {
            info!(
                "Knowledge base loaded from {} ({} bytes)",
                path.display(),
                knowledge.len()
            );
            Some(knowledge)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                "{} not found, continuing without knowledge base",
                path.display()
            );
            None
        }
        Err(err) => {
            error!("Error loading knowledge base: {}", err);
            None
        }
    }
}

pub(crate) struct Prompt;

#[async_trait]
impl Module for Prompt {
    async fn register_dependency(&mut self, dep_map: &mut DependencyMap) -> Result<(), Error> {
        let config: Arc<SharedConfig> = dep_map.get();

        let prompt = PromptContext::load(&config.system_prompt_path, &config.knowledge_base_path);
        dep_map.insert(prompt);

        Ok(())
    }
}
