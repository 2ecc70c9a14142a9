//! Chat-completions wire format shared by OpenAI, Azure OpenAI and
//! OpenAI-compatible endpoints

use serde::{Deserialize, Serialize};

use crate::providers::VendorCall;
use crate::request::{ConversationTurn, ResponseFormat, ServiceTier, TokenUsage};

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResponseFormatParam
{   #[serde(rename = "type")]
    pub kind: ResponseFormat
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormatParam>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub service_tier: Option<ServiceTier>
}

impl ChatCompletionRequest
{   /// Request with the classic `max_tokens` limit field
    pub fn from_call(call: &VendorCall<'_>) -> Self
    {   ChatCompletionRequest
        {   model: call.model.to_string()
          , messages: messages(call.turns)
          , max_tokens: call.options.max_tokens
          , max_completion_tokens: None
          , temperature: call.options.temperature
          , response_format: call.options.response_format
              .map(|kind| ResponseFormatParam { kind })
          , service_tier: None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse
{   #[serde(default)]
    pub choices: Vec<Choice>
  , #[serde(default)]
    pub usage: Option<Usage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ResponseMessage
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage
{   #[serde(default)]
    pub content: Option<String>
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage
{   pub prompt_tokens: u64
  , pub completion_tokens: u64
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse
{   pub data: Vec<ModelData>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelData
{   pub id: String
  , #[serde(default)]
    pub owned_by: Option<String>
}

/// Roles map one to one onto chat-completions roles.
pub fn messages(turns: &[ConversationTurn]) -> Vec<ChatMessage>
{   turns.iter()
      .map(|t| ChatMessage
      {   role: t.role.as_str().to_string()
        , content: t.message.clone()
      })
      .collect()
}

pub fn first_content(response: &ChatCompletionResponse) -> Option<String>
{   response.choices.first()
      .and_then(|c| c.message.content.clone())
}

pub fn token_usage(response: &ChatCompletionResponse) -> Option<TokenUsage>
{   response.usage.map(|u| TokenUsage
    {   input: u.prompt_tokens
      , output: u.completion_tokens
    })
}

pub fn model_ids(response: ModelsResponse) -> Vec<String>
{   response.data.into_iter().map(|m| m.id).collect()
}
