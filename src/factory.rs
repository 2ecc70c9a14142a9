//! Provider configuration to service

use std::sync::Arc;

use log::info;

use crate::config::{ConfigSource, ExecutionConfig, ProviderConfig};
use crate::error::Error;
use crate::executor::PromptExecutor;
use crate::providers::{
  AnthropicAdapter, AzureOpenAiAdapter, GeminiAdapter, OpenAiAdapter,
  OpenAiCompatibleAdapter, PackmindService,
};
use crate::service::LlmService;

/// Build the service matching the configuration's provider tag.
///
/// Construction never touches the network; clients are built on first
/// use. `source` is only consulted by the default-provider proxy.
pub fn create_llm_service(
  config: ProviderConfig
, source: Arc<dyn ConfigSource>
, execution: ExecutionConfig
) -> Arc<dyn LlmService>
{   info!("Creating LLM service for provider {}", config.provider());
    match config
    {   ProviderConfig::OpenAi(c) => {
          Arc::new(PromptExecutor::with_config(OpenAiAdapter::new(c), execution))
        }
      , ProviderConfig::Anthropic(c) => {
          Arc::new(PromptExecutor::with_config(AnthropicAdapter::new(c), execution))
        }
      , ProviderConfig::Gemini(c) => {
          Arc::new(PromptExecutor::with_config(GeminiAdapter::new(c), execution))
        }
      , ProviderConfig::OpenAiCompatible(c) => {
          Arc::new(PromptExecutor::with_config(OpenAiCompatibleAdapter::new(c), execution))
        }
      , ProviderConfig::AzureOpenAi(c) => {
          Arc::new(PromptExecutor::with_config(AzureOpenAiAdapter::new(c), execution))
        }
      , ProviderConfig::Packmind(_) => {
          Arc::new(PackmindService::with_config(source, execution))
        }
    }
}

/// Parse an untyped configuration object and build its service.
///
/// Fails with `Error::UnknownProvider` for a missing or unrecognised tag.
pub fn create_llm_service_from_json(
  value: serde_json::Value
, source: Arc<dyn ConfigSource>
, execution: ExecutionConfig
) -> Result<Arc<dyn LlmService>, Error>
{   let config = ProviderConfig::from_json(value)?;
    Ok(create_llm_service(config, source, execution))
}
