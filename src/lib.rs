pub mod error;
pub mod config;
pub mod request;
pub mod retry;
pub mod models;
pub mod normalize;
pub mod executor;
pub mod service;
pub mod providers;
pub mod factory;
pub mod store;
pub mod connection;
pub mod client;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use client::GatewayBackend;
pub use config::{ConfigSource, ExecutionConfig, GatewayConfig, ProviderConfig};
pub use error::{Error, ErrorKind};
pub use executor::PromptExecutor;
pub use factory::create_llm_service;
pub use request::{
  ConversationTurn, ExecutionResult, Performance, Prompt, PromptData,
  PromptOptions, PromptRequest, Role, TokenUsage,
};
pub use service::LlmService;

/*

allm-gateway: one request shape for every LLM vendor we talk to, and one
retry engine behind all of them.

src/
├── lib.rs          # Re-exports, provider tags, backend command types
├── error.rs        # Error type and error classification
├── config.rs       # Provider configs, engine config, config lookup
├── request.rs      # Unified request/result types
├── retry.rs        # Retry policy
├── models.rs       # Standard/fast model selection
├── normalize.rs    # Response content extraction and coercion
├── executor.rs     # Shared retry engine
├── service.rs      # Gateway surface
├── providers/      # Vendor adapters and the default-provider proxy
├── factory.rs      # Config -> service
├── store.rs        # Encrypted per-organization config cache
├── connection.rs   # Connection testing
└── client.rs       # Channel-driven backend task

*/

/// GATEWAY BACKEND INTERFACE:

// ===== ExecutePrompt =====

pub type ExecutePromptReply = ExecutionResult;
pub type ExecutePromptReplySender
  = tokio::sync::mpsc::UnboundedSender<ExecutePromptReply>;

pub struct ExecutePromptArgs
{   pub request: PromptRequest
  , pub reply: ExecutePromptReplySender
}

// ===== GetModels =====

pub type GetModelsReply = Result<Vec<String>, crate::error::Error>;
pub type GetModelsReplySender
  = tokio::sync::mpsc::UnboundedSender<GetModelsReply>;

pub struct GetModelsArgs
{   pub reply: GetModelsReplySender
}

// ===== IsConfigured =====

pub type IsConfiguredReply = bool;
pub type IsConfiguredReplySender
  = tokio::sync::mpsc::UnboundedSender<IsConfiguredReply>;

pub struct IsConfiguredArgs
{   pub reply: IsConfiguredReplySender
}

// ===== SetProviderConfig =====

pub type SetProviderConfigReply = Result<(), crate::error::Error>;
pub type SetProviderConfigReplySender
  = tokio::sync::mpsc::UnboundedSender<SetProviderConfigReply>;

pub struct SetProviderConfigArgs
{   pub config: ProviderConfig
  , pub reply: SetProviderConfigReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== GatewayHand (sender side) =====

pub struct GatewayHand
{   pub execute_prompt_tx
      : tokio::sync::mpsc::UnboundedSender<ExecutePromptArgs>
  , pub get_models_tx
      : tokio::sync::mpsc::UnboundedSender<GetModelsArgs>
  , pub is_configured_tx
      : tokio::sync::mpsc::UnboundedSender<IsConfiguredArgs>
  , pub set_provider_config_tx
      : tokio::sync::mpsc::UnboundedSender<SetProviderConfigArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== GatewayFoot (receiver side) =====

pub struct GatewayFoot
{   pub execute_prompt_rx
      : tokio::sync::mpsc::UnboundedReceiver<ExecutePromptArgs>
  , pub get_models_rx
      : tokio::sync::mpsc::UnboundedReceiver<GetModelsArgs>
  , pub is_configured_rx
      : tokio::sync::mpsc::UnboundedReceiver<IsConfiguredArgs>
  , pub set_provider_config_rx
      : tokio::sync::mpsc::UnboundedReceiver<SetProviderConfigArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// GATEWAY STRUCTURES:

/// Supported provider tags.
/// Each variant corresponds to one adapter the factory can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Provider
{
  /// OpenAI (GPT models)
  #[serde(rename = "openai")]
  OpenAi
  ,
  /// Anthropic (Claude models)
  #[serde(rename = "anthropic")]
  Anthropic
  ,
  /// Google Gemini
  #[serde(rename = "gemini")]
  Gemini
  ,
  /// Any endpoint speaking the OpenAI chat-completions protocol
  /// (Ollama, LM Studio, vLLM, ...)
  #[serde(rename = "openai-compatible")]
  OpenAiCompatible
  ,
  /// Azure-hosted OpenAI deployments
  #[serde(rename = "azure-openai")]
  AzureOpenAi
  ,
  /// Default-provider proxy: delegates to the platform's preferred vendor
  #[serde(rename = "packmind")]
  Packmind
}

impl Provider
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Provider::OpenAi => "openai"
          , Provider::Anthropic => "anthropic"
          , Provider::Gemini => "gemini"
          , Provider::OpenAiCompatible => "openai-compatible"
          , Provider::AzureOpenAi => "azure-openai"
          , Provider::Packmind => "packmind"
        }
    }
}

impl fmt::Display for Provider
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

impl FromStr for Provider
{   type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   match s
        {   "openai" => Ok(Provider::OpenAi)
          , "anthropic" => Ok(Provider::Anthropic)
          , "gemini" => Ok(Provider::Gemini)
          , "openai-compatible" => Ok(Provider::OpenAiCompatible)
          , "azure-openai" => Ok(Provider::AzureOpenAi)
          , "packmind" => Ok(Provider::Packmind)
          , other => Err(Error::UnknownProvider(other.to_string()))
        }
    }
}

/// Install `env_logger` as the log backend.
///
/// Honours `RUST_LOG`, defaults to `info`. Safe to call more than once.
pub fn init_logging()
{   let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
      )
      .try_init();
}
