use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::config::OpenAiCompatibleConfig;
use crate::error::Error;
use crate::executor::PromptExecutor;
use crate::models::ModelPair;
use crate::providers::chat_completions::{
  self, ChatCompletionRequest, ChatCompletionResponse, ModelsResponse,
};
use crate::providers::http::{send_json, HttpClient};
use crate::providers::{ProviderAdapter, VendorCall};
use crate::request::TokenUsage;
use crate::Provider;

/// Adapter for self-hosted or third-party endpoints speaking the OpenAI
/// chat-completions protocol. Reasoning models served this way often emit
/// `<think>` blocks, which are stripped.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleAdapter
{   endpoint: String
  , api_key: String
  , models: ModelPair
}

pub type OpenAiCompatibleService = PromptExecutor<OpenAiCompatibleAdapter>;

impl OpenAiCompatibleAdapter
{   pub fn new(config: OpenAiCompatibleConfig) -> Self
    {   debug!(
          "Creating OpenAiCompatibleAdapter for {}",
          config.llm_endpoint
        );
        OpenAiCompatibleAdapter
        {   models: ModelPair::with_fallback(
              Some(config.model.as_str()),
              config.fastest_model.as_deref()
            )
          , endpoint: config.llm_endpoint
          , api_key: config.llm_api_key
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter
{   type Client = HttpClient;
    type Request = ChatCompletionRequest;
    type Response = ChatCompletionResponse;

    fn provider(&self) -> Provider
    {   Provider::OpenAiCompatible
    }

    fn service_name(&self) -> &str
    {   "OpenAI-compatible"
    }

    fn models(&self) -> &ModelPair
    {   &self.models
    }

    fn is_configured(&self) -> bool
    {   !self.api_key.is_empty() && !self.endpoint.is_empty()
    }

    async fn connect(
      &self
    , timeout: Duration
    ) -> Result<Option<HttpClient>, Error>
    {   if !self.is_configured()
        {   return Ok(None);
        }
        HttpClient::new(&self.endpoint, &self.api_key, timeout).map(Some)
    }

    fn build_request(&self, call: &VendorCall<'_>) -> ChatCompletionRequest
    {   ChatCompletionRequest::from_call(call)
    }

    async fn send(
      &self
    , client: &HttpClient
    , request: &ChatCompletionRequest
    ) -> Result<ChatCompletionResponse, Error>
    {   send_json(
          client.http
            .post(client.url("chat/completions"))
            .bearer_auth(&client.api_key)
            .json(request),
          self.service_name()
        ).await
    }

    fn extract_text(&self, response: &ChatCompletionResponse) -> Option<String>
    {   chat_completions::first_content(response)
    }

    fn token_usage(&self, response: &ChatCompletionResponse) -> Option<TokenUsage>
    {   chat_completions::token_usage(response)
    }

    fn strips_thinking(&self) -> bool
    {   true
    }

    async fn list_models(&self, client: &HttpClient) -> Result<Vec<String>, Error>
    {   let models: ModelsResponse = send_json(
          client.http
            .get(client.url("models"))
            .bearer_auth(&client.api_key),
          self.service_name()
        ).await?;
        Ok(chat_completions::model_ids(models))
    }
}
