//! Connection testing for provider configurations

use std::sync::Arc;

use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigSource, ExecutionConfig, PackmindConfig, ProviderConfig};
use crate::error::{classify_message, ErrorKind};
use crate::factory::create_llm_service;
use crate::request::{Performance, PromptOptions};
use crate::service::LlmService;
use crate::store::ConfigurationStore;
use crate::Provider;

pub const TEST_PROMPT: &str = "Reply with the single word: hello";
pub const NO_CONFIGURATION_MESSAGE: &str = "No LLM configuration found for this organization";

static STATUS_CODE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?:HTTP\s+|\()([1-5]\d{2})\b").expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionError
{   #[serde(rename = "type")]
    pub kind: ErrorKind
  , pub message: String
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>
}

impl ConnectionError
{   /// Classify a failure message and pull out an HTTP status if present.
    ///
    /// An extracted 401 or 429 decides the kind before the text rules run.
    pub fn from_message(message: impl Into<String>) -> Self
    {   let message = message.into();
        let status_code = status_code(&message);
        let kind = match status_code
        {   Some(401) => ErrorKind::AuthenticationError
          , Some(429) => ErrorKind::RateLimit
          , _ => classify_message(&message)
        };
        ConnectionError
        {   kind
          , status_code
          , message
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTestResult
{   pub model: String
  , pub success: bool
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ConnectionError>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResult
{   pub provider: Provider
  , pub has_configuration: bool
  , pub overall_success: bool
  , pub standard_model: ModelTestResult
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_model: Option<ModelTestResult>
}

/// First `HTTP NNN` or `(NNN)` status in a failure message
pub fn status_code(message: &str) -> Option<u16>
{   STATUS_CODE.captures(message)
      .and_then(|c| c.get(1))
      .and_then(|m| m.as_str().parse().ok())
}

/// Fast model worth testing separately: explicitly configured and
/// different from the standard one.
fn distinct_fast_model(config: &ProviderConfig) -> Option<&str>
{   let (standard, fast) = match config
    {   ProviderConfig::OpenAi(c) => (c.model.as_deref(), c.fastest_model.as_deref())
      , ProviderConfig::Anthropic(c) => (c.model.as_deref(), c.fastest_model.as_deref())
      , ProviderConfig::Gemini(c) => (c.model.as_deref(), c.fastest_model.as_deref())
      , ProviderConfig::OpenAiCompatible(c) => {
          (Some(c.model.as_str()), c.fastest_model.as_deref())
        }
      , ProviderConfig::AzureOpenAi(c) => {
          (Some(c.model.as_str()), c.fastest_model.as_deref())
        }
      , ProviderConfig::Packmind(_) => (None, None)
    };
    fast.filter(|f| !f.is_empty() && Some(*f) != standard)
}

async fn test_model(
  service: &dyn LlmService
, performance: Performance
) -> ModelTestResult
{   let options = PromptOptions::default()
      .with_performance(performance)
      .with_retry_attempts(1);
    let result = service.execute_prompt(TEST_PROMPT, &options).await;

    if result.success
    {   ModelTestResult
        {   model: result.model
          , success: true
          , error: None
        }
    } else
    {   let message = result.error
          .unwrap_or_else(|| "Unknown error".to_string());
        warn!("Connection test failed for {}: {}", result.model, message);
        ModelTestResult
        {   model: result.model
          , success: false
          , error: Some(ConnectionError::from_message(message))
        }
    }
}

/// Probe an already-built service for the given configuration.
pub async fn run_connection_test(
  service: &dyn LlmService
, config: &ProviderConfig
) -> ConnectionTestResult
{   let provider = config.provider();
    info!("Testing {} connection", provider);

    let standard_model = test_model(service, Performance::Standard).await;
    let fast_model = match distinct_fast_model(config)
    {   Some(_) => Some(test_model(service, Performance::Fast).await)
      , None => None
    };

    let overall_success = standard_model.success
      && fast_model.as_ref().map_or(true, |f| f.success);
    info!("{} connection test finished: success={}", provider, overall_success);

    ConnectionTestResult
    {   provider
      , has_configuration: true
      , overall_success
      , standard_model
      , fast_model
    }
}

/// Build a service for `config` and probe it.
pub async fn test_connection(
  config: ProviderConfig
, source: Arc<dyn ConfigSource>
, execution: ExecutionConfig
) -> ConnectionTestResult
{   let service = create_llm_service(config.clone(), source, execution);
    run_connection_test(service.as_ref(), &config).await
}

/// Probe the configuration saved for an organization.
///
/// Without a saved configuration the default-provider proxy is tried when
/// it is usable; otherwise the result is a failed test.
pub async fn test_saved_configuration(
  store: &dyn ConfigurationStore
, org_id: &str
, source: Arc<dyn ConfigSource>
, execution: ExecutionConfig
) -> ConnectionTestResult
{   let stored = match store.get(org_id).await
    {   Ok(stored) => stored
      , Err(e) => {
          warn!("Failed to load LLM configuration for {}: {}", org_id, e);
          None
        }
    };

    if let Some(stored) = stored
    {   return test_connection(stored.config, source, execution).await;
    }

    let config = ProviderConfig::Packmind(PackmindConfig::default());
    let service = create_llm_service(config.clone(), source, execution);
    if service.is_configured().await
    {   info!("No configuration for {}, testing default provider", org_id);
        let mut result = run_connection_test(service.as_ref(), &config).await;
        result.has_configuration = false;
        return result;
    }

    ConnectionTestResult
    {   provider: Provider::Packmind
      , has_configuration: false
      , overall_success: false
      , standard_model: ModelTestResult
        {   model: String::new()
          , success: false
          , error: Some(ConnectionError::from_message(NO_CONFIGURATION_MESSAGE))
        }
      , fast_model: None
    }
}
