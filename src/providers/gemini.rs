use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::error::Error;
use crate::executor::PromptExecutor;
use crate::models::ModelPair;
use crate::providers::http::{send_json, HttpClient};
use crate::providers::{ProviderAdapter, VendorCall};
use crate::request::{ResponseFormat, Role, TokenUsage};
use crate::Provider;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_FAST_MODEL: &str = "gemini-2.5-flash";

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   #[serde(default)]
    pub text: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , #[serde(default)]
    pub parts: Vec<Part>
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>
}

impl GenerationConfig
{   fn is_empty(&self) -> bool
    {   self.max_output_tokens.is_none()
          && self.temperature.is_none()
          && self.response_mime_type.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   /// Model name; carried in the URL, not the body
    #[serde(skip)]
    pub model: String
  , pub contents: Vec<Content>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
  , #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate
{   #[serde(default)]
    pub content: Option<Content>
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata
{   #[serde(default)]
    pub prompt_token_count: u64
  , #[serde(default)]
    pub candidates_token_count: u64
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiModelsResponse
{   #[serde(default)]
    pub models: Vec<GeminiModel>
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiModel
{   pub name: String
}

fn text_content(role: Option<&str>, text: &str) -> Content
{   Content
    {   role: role.map(str::to_string)
      , parts: vec![Part { text: Some(text.to_string()) }]
    }
}

// ===== Adapter =====

/// Google Gemini `generateContent` adapter
#[derive(Debug, Clone)]
pub struct GeminiAdapter
{   api_key: String
  , api_base: String
  , models: ModelPair
}

pub type GeminiService = PromptExecutor<GeminiAdapter>;

impl GeminiAdapter
{   pub fn new(config: GeminiConfig) -> Self
    {   debug!("Creating GeminiAdapter");
        GeminiAdapter
        {   models: ModelPair::resolve(
              config.model.as_deref(),
              config.fastest_model.as_deref(),
              DEFAULT_MODEL,
              DEFAULT_FAST_MODEL
            )
          , api_base: config.api_base
              .filter(|b| !b.is_empty())
              .unwrap_or_else(|| GEMINI_API_BASE.to_string())
          , api_key: config.api_key
        }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter
{   type Client = HttpClient;
    type Request = GenerateContentRequest;
    type Response = GenerateContentResponse;

    fn provider(&self) -> Provider
    {   Provider::Gemini
    }

    fn service_name(&self) -> &str
    {   "Gemini"
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

    /// Assistant turns use Gemini's `model` role; system turns become the
    /// system instruction, unless nothing else is left to send.
    fn build_request(&self, call: &VendorCall<'_>) -> GenerateContentRequest
    {   let mut system: Vec<&str> = Vec::new();
        let mut contents = Vec::with_capacity(call.turns.len());

        for turn in call.turns
        {   match turn.role
            {   Role::System => system.push(&turn.message)
              , Role::User => contents.push(text_content(Some("user"), &turn.message))
              , Role::Assistant => contents.push(text_content(Some("model"), &turn.message))
            }
        }

        let generation = GenerationConfig
        {   max_output_tokens: call.options.max_tokens
          , temperature: call.options.temperature
          , response_mime_type: match call.options.response_format
            {   Some(ResponseFormat::JsonObject) => Some("application/json".to_string())
              , _ => None
            }
        };

        let system_instruction = if system.is_empty()
        {   None
        } else if contents.is_empty()
        {   debug!("Gemini history has only system turns, sending as user");
            contents.push(text_content(Some("user"), &system.join("\n\n")));
            None
        } else
        {   Some(text_content(None, &system.join("\n\n")))
        };

        GenerateContentRequest
        {   model: call.model.to_string()
          , contents
          , system_instruction
          , generation_config: if generation.is_empty() { None } else { Some(generation) }
        }
    }

    async fn send(
      &self
    , client: &HttpClient
    , request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>
    {   let path = format!("v1beta/models/{}:generateContent", request.model);
        send_json(
          client.http
            .post(client.url(&path))
            .header("x-goog-api-key", &client.api_key)
            .json(request),
          self.service_name()
        ).await
    }

    fn extract_text(&self, response: &GenerateContentResponse) -> Option<String>
    {   response.candidates.first()
          .and_then(|c| c.content.as_ref())
          .and_then(|c| c.parts.first())
          .and_then(|p| p.text.clone())
    }

    fn token_usage(&self, response: &GenerateContentResponse) -> Option<TokenUsage>
    {   response.usage_metadata.map(|u| TokenUsage
        {   input: u.prompt_token_count
          , output: u.candidates_token_count
        })
    }

    async fn list_models(&self, client: &HttpClient) -> Result<Vec<String>, Error>
    {   let models: GeminiModelsResponse = send_json(
          client.http
            .get(client.url("v1beta/models"))
            .header("x-goog-api-key", &client.api_key),
          self.service_name()
        ).await?;
        Ok(models.models
          .into_iter()
          .map(|m| m.name.trim_start_matches("models/").to_string())
          .collect())
    }
}
