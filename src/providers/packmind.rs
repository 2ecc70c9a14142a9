//! Default-provider proxy
//!
//! Reads `PACKMIND_DEFAULT_PROVIDER` on first use, builds the matching
//! vendor service with credentials from the same [`ConfigSource`], and
//! delegates every call to it.

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info, warn};
use tokio::sync::OnceCell;

use crate::config::{
  AnthropicConfig, ConfigSource, ExecutionConfig, GeminiConfig, OpenAiConfig,
  ANTHROPIC_API_BASE, ANTHROPIC_API_KEY, DEFAULT_PROVIDER_KEY, GEMINI_API_BASE,
  GEMINI_API_KEY, OPENAI_API_BASE, OPENAI_API_KEY,
};
use crate::error::Error;
use crate::executor::PromptExecutor;
use crate::providers::{AnthropicAdapter, GeminiAdapter, OpenAiAdapter};
use crate::request::{ConversationTurn, ExecutionResult, PromptOptions};
use crate::service::LlmService;
use crate::Provider;

/// Model reported when no delegate could be built
pub const UNKNOWN_MODEL: &str = "unknown";

pub struct PackmindService
{   source: Arc<dyn ConfigSource>
  , execution: ExecutionConfig
  , delegate: OnceCell<Arc<dyn LlmService>>
}

impl PackmindService
{   pub fn new(source: Arc<dyn ConfigSource>) -> Self
    {   Self::with_config(source, ExecutionConfig::default())
    }

    pub fn with_config(
      source: Arc<dyn ConfigSource>
    , execution: ExecutionConfig
    ) -> Self
    {   PackmindService
        {   source
          , execution
          , delegate: OnceCell::new()
        }
    }

    /// Provider named by the default-provider setting.
    ///
    /// Absent, unparseable, self-referencing or unreadable settings all
    /// resolve to OpenAI.
    pub async fn configured_provider(&self) -> Provider
    {   let value = match self.source.get_config(DEFAULT_PROVIDER_KEY).await
        {   Ok(value) => value
          , Err(e) => {
              warn!(
                "Error reading {}, defaulting to OpenAI: {}",
                DEFAULT_PROVIDER_KEY, e
              );
              return Provider::OpenAi;
            }
        };

        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
          info!("{} not set, defaulting to OpenAI", DEFAULT_PROVIDER_KEY);
          return Provider::OpenAi;
        };

        match value.trim().parse::<Provider>()
        {   Ok(Provider::Packmind) => {
              warn!(
                "{} cannot be \"packmind\", defaulting to OpenAI",
                DEFAULT_PROVIDER_KEY
              );
              Provider::OpenAi
            }
          , Ok(provider) => provider
          , Err(_) => {
              warn!(
                "Invalid {} value {:?}, defaulting to OpenAI",
                DEFAULT_PROVIDER_KEY, value
              );
              Provider::OpenAi
            }
        }
    }

    /// Provider the proxy currently delegates to, if the delegate is built
    pub fn delegate_provider(&self) -> Option<Provider>
    {   self.delegate.get().map(|d| d.provider())
    }

    async fn required(&self, key: &str) -> Result<String, Error>
    {   self.source.get_config(key).await?
          .filter(|v| !v.is_empty())
          .ok_or_else(|| Error::MissingConfig(key.to_string()))
    }

    async fn optional(&self, key: &str) -> Option<String>
    {   self.source.get_config(key).await
          .ok()
          .flatten()
          .filter(|v| !v.is_empty())
    }

    async fn build_delegate(&self) -> Result<Arc<dyn LlmService>, Error>
    {   let provider = self.configured_provider().await;
        info!("Initializing PackmindService with provider {}", provider);
        let execution = self.execution.clone();

        let service: Arc<dyn LlmService> = match provider
        {   Provider::OpenAi => {
              let config = OpenAiConfig
              {   api_key: self.required(OPENAI_API_KEY).await?
                , api_base: self.optional(OPENAI_API_BASE).await
                , ..Default::default()
              };
              Arc::new(PromptExecutor::with_config(OpenAiAdapter::new(config), execution))
            }
          , Provider::Anthropic => {
              let config = AnthropicConfig
              {   api_key: self.required(ANTHROPIC_API_KEY).await?
                , api_base: self.optional(ANTHROPIC_API_BASE).await
                , ..Default::default()
              };
              Arc::new(PromptExecutor::with_config(AnthropicAdapter::new(config), execution))
            }
          , Provider::Gemini => {
              let config = GeminiConfig
              {   api_key: self.required(GEMINI_API_KEY).await?
                , api_base: self.optional(GEMINI_API_BASE).await
                , ..Default::default()
              };
              Arc::new(PromptExecutor::with_config(GeminiAdapter::new(config), execution))
            }
          , other => {
              error!("{} provider is not supported for {}", other, DEFAULT_PROVIDER_KEY);
              return Err(Error::NotImplemented(format!(
                "{} provider is not supported for {}. \
                 Only openai, anthropic, and gemini are supported.",
                other, DEFAULT_PROVIDER_KEY
              )));
            }
        };

        info!("PackmindService initialized successfully with {}", provider);
        Ok(service)
    }

    /// Build the delegate once. Failures are not cached, so a later call
    /// sees configuration fixed in the meantime.
    async fn delegate(&self) -> Result<&Arc<dyn LlmService>, Error>
    {   self.delegate
          .get_or_try_init(|| self.build_delegate())
          .await
          .map_err(|e| {
            error!("Failed to initialize PackmindService: {}", e);
            e
          })
    }
}

#[async_trait]
impl LlmService for PackmindService
{   fn provider(&self) -> Provider
    {   Provider::Packmind
    }

    async fn execute_prompt(
      &self
    , prompt: &str
    , options: &PromptOptions
    ) -> ExecutionResult
    {   info!("Executing prompt via PackmindService ({} chars)", prompt.len());
        match self.delegate().await
        {   Ok(delegate) => delegate.execute_prompt(prompt, options).await
          , Err(e) => ExecutionResult::failed(e.to_string(), 1, UNKNOWN_MODEL)
        }
    }

    async fn execute_prompt_with_history(
      &self
    , turns: &[ConversationTurn]
    , options: &PromptOptions
    ) -> ExecutionResult
    {   info!(
          "Executing prompt with history via PackmindService ({} turns)",
          turns.len()
        );
        match self.delegate().await
        {   Ok(delegate) => delegate.execute_prompt_with_history(turns, options).await
          , Err(e) => ExecutionResult::failed(e.to_string(), 1, UNKNOWN_MODEL)
        }
    }

    async fn get_models(&self) -> Result<Vec<String>, Error>
    {   match self.delegate().await
        {   Ok(delegate) => delegate.get_models().await
          , Err(e) => {
              warn!("PackmindService cannot list models: {}", e);
              Ok(Vec::new())
            }
        }
    }

    async fn is_configured(&self) -> bool
    {   match self.delegate().await
        {   Ok(delegate) => delegate.is_configured().await
          , Err(e) => {
              warn!("PackmindService configuration check failed: {}", e);
              false
            }
        }
    }
}
