use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::config::AzureOpenAiConfig;
use crate::error::Error;
use crate::executor::PromptExecutor;
use crate::models::ModelPair;
use crate::providers::chat_completions::{
  self, ChatCompletionRequest, ChatCompletionResponse,
};
use crate::providers::http::{send_json, HttpClient};
use crate::providers::{ProviderAdapter, VendorCall};
use crate::request::TokenUsage;
use crate::Provider;

pub const DEFAULT_API_VERSION: &str = "2024-12-01-preview";

/// Azure OpenAI adapter. Models are deployment names; the fast
/// deployment falls back to the standard one.
#[derive(Debug, Clone)]
pub struct AzureOpenAiAdapter
{   endpoint: String
  , api_key: String
  , api_version: String
  , models: ModelPair
}

pub type AzureOpenAiService = PromptExecutor<AzureOpenAiAdapter>;

impl AzureOpenAiAdapter
{   pub fn new(config: AzureOpenAiConfig) -> Self
    {   debug!("Creating AzureOpenAiAdapter for {}", config.endpoint);
        AzureOpenAiAdapter
        {   models: ModelPair::with_fallback(
              Some(config.model.as_str()),
              config.fastest_model.as_deref()
            )
          , api_version: config.api_version
              .filter(|v| !v.is_empty())
              .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
          , endpoint: config.endpoint
          , api_key: config.api_key
        }
    }

    pub fn api_version(&self) -> &str
    {   &self.api_version
    }
}

#[async_trait]
impl ProviderAdapter for AzureOpenAiAdapter
{   type Client = HttpClient;
    type Request = ChatCompletionRequest;
    type Response = ChatCompletionResponse;

    fn provider(&self) -> Provider
    {   Provider::AzureOpenAi
    }

    fn service_name(&self) -> &str
    {   "Azure OpenAI"
    }

    fn models(&self) -> &ModelPair
    {   &self.models
    }

    fn is_configured(&self) -> bool
    {   !self.endpoint.is_empty() && !self.api_key.is_empty()
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
    {   let path = format!("openai/deployments/{}/chat/completions", request.model);
        send_json(
          client.http
            .post(client.url(&path))
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &client.api_key)
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

    fn check_model_listing(&self) -> Result<(), Error>
    {   Err(Error::NotImplemented(
          "Azure OpenAI does not support listing deployments: \
           enumerating them requires Azure management-plane credentials"
            .to_string()
        ))
    }

    async fn list_models(&self, _client: &HttpClient) -> Result<Vec<String>, Error>
    {   self.check_model_listing().map(|_| Vec::new())
    }
}
