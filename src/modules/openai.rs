use std::sync::Arc;

use anyhow::Error;
use async_openai::types::{ChatCompletionRequestMessage, CreateChatCompletionRequestArgs};
use async_openai::Client;
use teloxide::dptree::di::{DependencyMap, DependencySupplier};

use crate::{config::SharedConfig, module_mgr::Module};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct ChatModelResult {
    pub content: String,
    pub token_usage: u32,
}

/// A completion service answering a list of chat messages.
#[async_trait]
pub(crate) trait ChatModel: Send + Sync {
    async fn request_chat_model(
        &self,
        msgs: Vec<ChatCompletionRequestMessage>,
    ) -> Result<ChatModelResult, Error>;
}

pub(crate) type SharedChatModel = Arc<dyn ChatModel>;

#[derive(Clone)]
pub(crate) struct OpenAIClient {
    client: Client,
    config: SharedConfig,
}

impl OpenAIClient {
    pub(crate) fn new(config: SharedConfig) -> Self {
        Self {
            client: Client::new().with_api_key(&config.openai_api_key),
            config,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAIClient {
    async fn request_chat_model(
        &self,
        msgs: Vec<ChatCompletionRequestMessage>,
    ) -> Result<ChatModelResult, Error> {
        let req = CreateChatCompletionRequestArgs::default()
            .model(&self.config.openai_gpt_model)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .messages(msgs)
            .build()?;

        let resp = self.client.chat().create(req).await?;
        let token_usage = resp.usage.map(|u| u.total_tokens).unwrap_or(0);
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Server responds with empty data"))?;

        let content = choice.message.content.trim().to_owned();
        if content.is_empty() {
            return Err(anyhow!("Server returned empty response"));
        }

        Ok(ChatModelResult {
            content,
            token_usage,
        })
    }
}

pub(crate) struct OpenAI;

#[async_trait]
impl Module for OpenAI {
    async fn register_dependency(&mut self, dep_map: &mut DependencyMap) -> Result<(), Error> {
        let config: Arc<SharedConfig> = dep_map.get();

        let openai_client: SharedChatModel = Arc::new(OpenAIClient::new(config.as_ref().clone()));
        debug!("OpenAI client is ready, model: {}", config.openai_gpt_model);
        dep_map.insert(openai_client);

        Ok(())
    }
}
