//! Unified request and result types for the gateway

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   User
  , System
  , Assistant
}

impl Role
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Role::User => "user"
          , Role::System => "system"
          , Role::Assistant => "assistant"
        }
    }
}

/// One turn of a conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn
{   pub role: Role
  , pub message: String
}

impl ConversationTurn
{   pub fn new(role: Role, message: impl Into<String>) -> Self
    {   ConversationTurn { role, message: message.into() }
    }

    pub fn user(message: impl Into<String>) -> Self
    {   Self::new(Role::User, message)
    }

    pub fn system(message: impl Into<String>) -> Self
    {   Self::new(Role::System, message)
    }

    pub fn assistant(message: impl Into<String>) -> Self
    {   Self::new(Role::Assistant, message)
    }
}

/// Prompt payload: a single string or an ordered conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt
{   Text(String)
  , Conversation(Vec<ConversationTurn>)
}

/// Model tier hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Performance
{   #[default]
    Standard
  , Fast
}

/// OpenAI processing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTier
{   #[default]
    Auto
  , Default
  , Flex
  , Scale
  , Priority
}

impl ServiceTier
{   /// Case-insensitive parse; anything unrecognised falls back to `Auto`.
    pub fn from_hint(hint: Option<&str>) -> Self
    {   match hint.map(|h| h.trim().to_lowercase()).as_deref()
        {   Some("default") => ServiceTier::Default
          , Some("flex") => ServiceTier::Flex
          , Some("scale") => ServiceTier::Scale
          , Some("priority") => ServiceTier::Priority
          , _ => ServiceTier::Auto
        }
    }
}

/// Requested output format, passed through to vendors that support it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat
{   Text
  , JsonObject
}

/// Per-call tuning options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptOptions
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , /// Total attempt budget; the engine default applies when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<Performance>
  , /// Raw tier hint, interpreted by providers that support tiers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_tier: Option<String>
}

impl PromptOptions
{   pub fn fast() -> Self
    {   PromptOptions
        {   performance: Some(Performance::Fast)
          , ..Default::default()
        }
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self
    {   self.retry_attempts = Some(attempts);
        self
    }

    pub fn with_performance(mut self, performance: Performance) -> Self
    {   self.performance = Some(performance);
        self
    }

    pub fn with_service_tier(mut self, tier: impl Into<String>) -> Self
    {   self.service_tier = Some(tier.into());
        self
    }
}

/// Unified prompt request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest
{   pub prompt: Prompt
  , #[serde(default)]
    pub options: PromptOptions
}

impl PromptRequest
{   pub fn text(prompt: impl Into<String>) -> Self
    {   PromptRequest
        {   prompt: Prompt::Text(prompt.into())
          , options: PromptOptions::default()
        }
    }

    pub fn conversation(turns: Vec<ConversationTurn>) -> Self
    {   PromptRequest
        {   prompt: Prompt::Conversation(turns)
          , options: PromptOptions::default()
        }
    }

    pub fn with_options(mut self, options: PromptOptions) -> Self
    {   self.options = options;
        self
    }
}

/// Token accounting reported by the vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage
{   pub input: u64
  , pub output: u64
}

/// Coerced response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptData
{   Text(String)
  , Json(serde_json::Value)
}

impl PromptData
{   pub fn as_text(&self) -> Option<&str>
    {   match self
        {   PromptData::Text(text) => Some(text)
          , PromptData::Json(_) => None
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value>
    {   match self
        {   PromptData::Json(value) => Some(value)
          , PromptData::Text(_) => None
        }
    }

    fn into_value(self) -> serde_json::Value
    {   match self
        {   PromptData::Json(value) => value
          , PromptData::Text(text) => serde_json::Value::String(text)
        }
    }
}

/// Uniform result envelope.
///
/// `success == true` implies `data` is present and `error` absent;
/// `success == false` implies the reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult<T = PromptData>
{   pub success: bool
  , pub data: Option<T>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>
  , pub attempts: u32
  , pub model: String
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenUsage>
}

impl<T> ExecutionResult<T>
{   pub fn succeeded(
      data: T
    , attempts: u32
    , model: impl Into<String>
    , tokens_used: Option<TokenUsage>
    ) -> Self
    {   ExecutionResult
        {   success: true
          , data: Some(data)
          , error: None
          , attempts
          , model: model.into()
          , tokens_used
        }
    }

    pub fn failed(
      error: impl Into<String>
    , attempts: u32
    , model: impl Into<String>
    ) -> Self
    {   ExecutionResult
        {   success: false
          , data: None
          , error: Some(error.into())
          , attempts
          , model: model.into()
          , tokens_used: None
        }
    }
}

impl ExecutionResult<PromptData>
{   /// Deserialize the payload into a caller type.
    ///
    /// JSON payloads deserialize directly; text payloads deserialize as a
    /// JSON string, so `String` targets always work.
    pub fn into_typed<T: DeserializeOwned>(
      self
    ) -> Result<ExecutionResult<T>, crate::error::Error>
    {   let data = match self.data
        {   Some(data) => Some(serde_json::from_value(data.into_value())?)
          , None => None
        };
        Ok(ExecutionResult
        {   success: self.success
          , data
          , error: self.error
          , attempts: self.attempts
          , model: self.model
          , tokens_used: self.tokens_used
        })
    }
}
