//! Configuration for providers, the execution engine and configuration
//! lookup

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::retry::DEFAULT_RETRY_ATTEMPTS;
use crate::Provider;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const OPENAI_API_BASE: &str = "OPENAI_API_BASE";
pub const ANTHROPIC_API_BASE: &str = "ANTHROPIC_API_BASE";
pub const GEMINI_API_BASE: &str = "GEMINI_API_BASE";
pub const DEFAULT_PROVIDER_KEY: &str = "PACKMIND_DEFAULT_PROVIDER";
pub const ENCRYPTION_KEY: &str = "LLM_ENCRYPTION_KEY";

/// OpenAI provider configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiConfig
{   #[serde(default)]
    pub api_key: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_model: Option<String>
  , /// API base URL (if custom)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>
}

/// Anthropic provider configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnthropicConfig
{   #[serde(default)]
    pub api_key: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_model: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>
}

/// Gemini provider configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig
{   #[serde(default)]
    pub api_key: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_model: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>
}

/// Generic OpenAI-compatible endpoint configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiCompatibleConfig
{   #[serde(default)]
    pub llm_endpoint: String
  , #[serde(default)]
    pub llm_api_key: String
  , #[serde(default)]
    pub model: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_model: Option<String>
}

/// Azure OpenAI configuration; models are deployment names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureOpenAiConfig
{   #[serde(default)]
    pub endpoint: String
  , #[serde(default)]
    pub api_key: String
  , #[serde(default)]
    pub model: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_model: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>
}

/// Default-provider proxy configuration; carries no fields of its own
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackmindConfig {}

/// Provider configuration, discriminated by the `provider` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum ProviderConfig
{   #[serde(rename = "openai")]
    OpenAi(OpenAiConfig)
  , #[serde(rename = "anthropic")]
    Anthropic(AnthropicConfig)
  , #[serde(rename = "gemini")]
    Gemini(GeminiConfig)
  , #[serde(rename = "openai-compatible")]
    OpenAiCompatible(OpenAiCompatibleConfig)
  , #[serde(rename = "azure-openai")]
    AzureOpenAi(AzureOpenAiConfig)
  , #[serde(rename = "packmind")]
    Packmind(PackmindConfig)
}

impl ProviderConfig
{   pub fn provider(&self) -> Provider
    {   match self
        {   ProviderConfig::OpenAi(_) => Provider::OpenAi
          , ProviderConfig::Anthropic(_) => Provider::Anthropic
          , ProviderConfig::Gemini(_) => Provider::Gemini
          , ProviderConfig::OpenAiCompatible(_) => Provider::OpenAiCompatible
          , ProviderConfig::AzureOpenAi(_) => Provider::AzureOpenAi
          , ProviderConfig::Packmind(_) => Provider::Packmind
        }
    }

    /// Parse a JSON configuration object.
    ///
    /// A missing or unrecognised `provider` tag is reported as
    /// `Error::UnknownProvider` rather than a generic parse error.
    pub fn from_json(value: serde_json::Value) -> Result<Self, Error>
    {   let tag = value.get("provider")
          .and_then(|p| p.as_str())
          .unwrap_or_default()
          .to_string();
        tag.parse::<Provider>()?;
        debug!("Parsing provider config for: {}", tag);
        Ok(serde_json::from_value(value)?)
    }

    /// Secret held by this configuration, if any
    pub fn secret(&self) -> Option<&str>
    {   match self
        {   ProviderConfig::OpenAi(c) => Some(c.api_key.as_str())
          , ProviderConfig::Anthropic(c) => Some(c.api_key.as_str())
          , ProviderConfig::Gemini(c) => Some(c.api_key.as_str())
          , ProviderConfig::OpenAiCompatible(c) => Some(c.llm_api_key.as_str())
          , ProviderConfig::AzureOpenAi(c) => Some(c.api_key.as_str())
          , ProviderConfig::Packmind(_) => None
        }
        .filter(|s| !s.is_empty())
    }

    /// Replace the secret in place with the output of `f`.
    pub fn map_secret<F>(&mut self, f: F) -> Result<(), Error>
    where
      F: FnOnce(&str) -> Result<String, Error>
    {   let slot = match self
        {   ProviderConfig::OpenAi(c) => &mut c.api_key
          , ProviderConfig::Anthropic(c) => &mut c.api_key
          , ProviderConfig::Gemini(c) => &mut c.api_key
          , ProviderConfig::OpenAiCompatible(c) => &mut c.llm_api_key
          , ProviderConfig::AzureOpenAi(c) => &mut c.api_key
          , ProviderConfig::Packmind(_) => return Ok(())
        };
        if slot.is_empty()
        {   return Ok(());
        }
        let replaced = f(slot.as_str())?;
        *slot = replaced;
        Ok(())
    }
}

fn default_retry_attempts() -> u32
{   DEFAULT_RETRY_ATTEMPTS
}

fn default_timeout_secs() -> u64
{   60
}

/// Execution engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionConfig
{   /// Attempt budget when the call does not set one
    #[serde(default = "default_retry_attempts")]
    pub default_retry_attempts: u32
  , /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64
}

impl Default for ExecutionConfig
{   fn default() -> Self
    {   ExecutionConfig
        {   default_retry_attempts: DEFAULT_RETRY_ATTEMPTS
          , request_timeout_secs: default_timeout_secs()
        }
    }
}

impl ExecutionConfig
{   pub fn request_timeout(&self) -> std::time::Duration
    {   std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig
{   /// Active provider
    pub provider: ProviderConfig
  , /// Engine settings
    #[serde(default)]
    pub execution: ExecutionConfig
}

impl GatewayConfig
{   pub fn from_json_str(text: &str) -> Result<Self, Error>
    {   let mut value: serde_json::Value = serde_json::from_str(text)?;
        let provider = value.get_mut("provider")
          .map(serde_json::Value::take)
          .ok_or_else(|| Error::UnknownProvider(String::new()))?;
        let execution = match value.get_mut("execution")
        {   Some(v) => serde_json::from_value(v.take())?
          , None => ExecutionConfig::default()
        };
        Ok(GatewayConfig
        {   provider: ProviderConfig::from_json(provider)?
          , execution
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error>
    {   let path = path.as_ref();
        debug!("Loading gateway config from {}", path.display());
        let text = std::fs::read_to_string(path)
          .map_err(|e| Error::Other(
            format!("{}: {}", path.display(), e)
          ))?;
        Self::from_json_str(&text)
    }
}

/// Key-value configuration lookup.
///
/// An absent key is `Ok(None)`, not an error.
#[async_trait]
pub trait ConfigSource: Send + Sync
{   async fn get_config(&self, key: &str) -> Result<Option<String>, Error>;
}

/// Reads configuration from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigSource;

#[async_trait]
impl ConfigSource for EnvConfigSource
{   async fn get_config(&self, key: &str) -> Result<Option<String>, Error>
    {   Ok(std::env::var(key).ok().filter(|v| !v.is_empty()))
    }
}

/// In-memory configuration
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource
{   values: HashMap<String, String>
}

impl StaticConfigSource
{   pub fn new() -> Self
    {   Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self
    {   self.values.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for StaticConfigSource
where
  K: Into<String>
, V: Into<String>
{   fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self
    {   StaticConfigSource
        {   values: iter.into_iter()
              .map(|(k, v)| (k.into(), v.into()))
              .collect()
        }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource
{   async fn get_config(&self, key: &str) -> Result<Option<String>, Error>
    {   Ok(self.values.get(key).filter(|v| !v.is_empty()).cloned())
    }
}
