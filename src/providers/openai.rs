use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};

use crate::config::OpenAiConfig;
use crate::error::Error;
use crate::executor::PromptExecutor;
use crate::models::ModelPair;
use crate::providers::chat_completions::{
  self, ChatCompletionRequest, ChatCompletionResponse, ModelsResponse,
};
use crate::providers::http::{send_json, HttpClient};
use crate::providers::{ProviderAdapter, VendorCall};
use crate::request::{ServiceTier, TokenUsage};
use crate::Provider;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-5.1";
pub const DEFAULT_FAST_MODEL: &str = "gpt-4.1-mini";

/// OpenAI chat-completions adapter
#[derive(Debug, Clone)]
pub struct OpenAiAdapter
{   api_key: String
  , api_base: String
  , models: ModelPair
}

pub type OpenAiService = PromptExecutor<OpenAiAdapter>;

impl OpenAiAdapter
{   pub fn new(config: OpenAiConfig) -> Self
    {   debug!("Creating OpenAiAdapter");
        OpenAiAdapter
        {   models: ModelPair::resolve(
              config.model.as_deref(),
              config.fastest_model.as_deref(),
              DEFAULT_MODEL,
              DEFAULT_FAST_MODEL
            )
          , api_base: config.api_base
              .filter(|b| !b.is_empty())
              .unwrap_or_else(|| OPENAI_API_BASE.to_string())
          , api_key: config.api_key
        }
    }

    pub fn api_base(&self) -> &str
    {   &self.api_base
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter
{   type Client = HttpClient;
    type Request = ChatCompletionRequest;
    type Response = ChatCompletionResponse;

    fn provider(&self) -> Provider
    {   Provider::OpenAi
    }

    fn service_name(&self) -> &str
    {   "OpenAI"
    }

    fn models(&self) -> &ModelPair
    {   &self.models
    }

    fn is_configured(&self) -> bool
    {   !self.api_key.is_empty()
    }

    async fn connect(
      &self
    , timeout: Duration
    ) -> Result<Option<HttpClient>, Error>
    {   if self.api_key.is_empty()
        {   return Ok(None);
        }
        HttpClient::new(&self.api_base, &self.api_key, timeout).map(Some)
    }

    fn build_request(&self, call: &VendorCall<'_>) -> ChatCompletionRequest
    {   let mut request = ChatCompletionRequest::from_call(call);
        // current OpenAI models reject `max_tokens`
        request.max_completion_tokens = request.max_tokens.take();
        request.service_tier = Some(ServiceTier::from_hint(
          call.options.service_tier.as_deref()
        ));
        trace!("OpenAI service tier: {:?}", request.service_tier);
        request
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
