use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::AnthropicConfig;
use crate::error::Error;
use crate::executor::PromptExecutor;
use crate::models::ModelPair;
use crate::providers::http::{send_json, HttpClient};
use crate::providers::{ProviderAdapter, VendorCall};
use crate::request::{Role, TokenUsage};
use crate::Provider;

pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_FAST_MODEL: &str = "claude-haiku-4-5-20251001";
pub const DEFAULT_MAX_TOKENS: u32 = 64000;

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest
{   pub model: String
  , pub max_tokens: u32
  , pub messages: Vec<AnthropicMessage>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse
{   #[serde(default)]
    pub content: Vec<ContentBlock>
  , #[serde(default)]
    pub usage: Option<AnthropicUsage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock
{   #[serde(rename = "type")]
    pub kind: String
  , #[serde(default)]
    pub text: Option<String>
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AnthropicUsage
{   pub input_tokens: u64
  , pub output_tokens: u64
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicModelsResponse
{   pub data: Vec<AnthropicModel>
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicModel
{   pub id: String
}

// ===== Adapter =====

/// Anthropic Messages API adapter
#[derive(Debug, Clone)]
pub struct AnthropicAdapter
{   api_key: String
  , api_base: String
  , models: ModelPair
}

pub type AnthropicService = PromptExecutor<AnthropicAdapter>;

impl AnthropicAdapter
{   pub fn new(config: AnthropicConfig) -> Self
    {   debug!("Creating AnthropicAdapter");
        AnthropicAdapter
        {   models: ModelPair::resolve(
              config.model.as_deref(),
              config.fastest_model.as_deref(),
              DEFAULT_MODEL,
              DEFAULT_FAST_MODEL
            )
          , api_base: config.api_base
              .filter(|b| !b.is_empty())
              .unwrap_or_else(|| ANTHROPIC_API_BASE.to_string())
          , api_key: config.api_key
        }
    }

    fn headers(
      &self
    , client: &HttpClient
    , builder: reqwest::RequestBuilder
    ) -> reqwest::RequestBuilder
    {   builder
          .header("x-api-key", &client.api_key)
          .header("anthropic-version", ANTHROPIC_VERSION)
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter
{   type Client = HttpClient;
    type Request = MessagesRequest;
    type Response = MessagesResponse;

    fn provider(&self) -> Provider
    {   Provider::Anthropic
    }

    fn service_name(&self) -> &str
    {   "Anthropic"
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

    /// System turns go to the top-level `system` field, joined in order.
    /// A history of system turns only is sent as one user message, since
    /// the Messages API requires at least one.
    fn build_request(&self, call: &VendorCall<'_>) -> MessagesRequest
    {   let mut system: Vec<&str> = Vec::new();
        let mut messages = Vec::with_capacity(call.turns.len());

        for turn in call.turns
        {   match turn.role
            {   Role::System => system.push(&turn.message)
              , Role::User | Role::Assistant => messages.push(AnthropicMessage
                {   role: turn.role.as_str().to_string()
                  , content: turn.message.clone()
                })
            }
        }

        let mut system = if system.is_empty() { None } else { Some(system.join("\n\n")) };
        if messages.is_empty()
        {   if let Some(text) = system.take()
            {   debug!("Anthropic history has only system turns, sending as user");
                messages.push(AnthropicMessage
                {   role: Role::User.as_str().to_string()
                  , content: text
                });
            }
        }

        MessagesRequest
        {   model: call.model.to_string()
          , max_tokens: call.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
          , messages
          , system
          , temperature: call.options.temperature
        }
    }

    async fn send(
      &self
    , client: &HttpClient
    , request: &MessagesRequest
    ) -> Result<MessagesResponse, Error>
    {   let builder = client.http
          .post(client.url("v1/messages"))
          .json(request);
        send_json(self.headers(client, builder), self.service_name()).await
    }

    fn extract_text(&self, response: &MessagesResponse) -> Option<String>
    {   response.content.iter()
          .find(|block| block.kind == "text")
          .and_then(|block| block.text.clone())
    }

    fn token_usage(&self, response: &MessagesResponse) -> Option<TokenUsage>
    {   response.usage.map(|u| TokenUsage
        {   input: u.input_tokens
          , output: u.output_tokens
        })
    }

    async fn list_models(&self, client: &HttpClient) -> Result<Vec<String>, Error>
    {   let builder = client.http.get(client.url("v1/models"));
        let models: AnthropicModelsResponse =
          send_json(self.headers(client, builder), self.service_name()).await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}
