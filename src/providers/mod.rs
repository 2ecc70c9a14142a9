//! LLM provider adapters
//!
//! Each adapter only knows how to reach one vendor: which models to use by
//! default, how to shape and send a request, and where the text lives in
//! the response. Retry, classification and normalization live in
//! [`crate::executor::PromptExecutor`].

pub mod http;
pub mod chat_completions;
pub mod openai;
pub mod anthropic;
pub mod gemini;
pub mod azure;
pub mod compatible;
pub mod packmind;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Error;
use crate::models::ModelPair;
use crate::request::{ConversationTurn, PromptOptions, TokenUsage};
use crate::Provider;

// Re-export for convenience
pub use anthropic::{AnthropicAdapter, AnthropicService};
pub use azure::{AzureOpenAiAdapter, AzureOpenAiService};
pub use compatible::{OpenAiCompatibleAdapter, OpenAiCompatibleService};
pub use gemini::{GeminiAdapter, GeminiService};
pub use openai::{OpenAiAdapter, OpenAiService};
pub use packmind::PackmindService;

/// Normalized input for one vendor call
#[derive(Debug, Clone, Copy)]
pub struct VendorCall<'a>
{   pub model: &'a str
  , pub turns: &'a [ConversationTurn]
  , pub options: &'a PromptOptions
}

/// What a vendor integration contributes to the shared engine
#[async_trait]
pub trait ProviderAdapter: Send + Sync + 'static
{   /// Connected vendor handle, built once per executor
    type Client: Send + Sync;
    /// Vendor request body
    type Request: Send + Sync + std::fmt::Debug;
    /// Vendor response body
    type Response: Send;

    fn provider(&self) -> Provider;

    /// Name used in log lines and user-facing failure messages
    fn service_name(&self) -> &str;

    /// Standard/fast models after merging configuration over defaults
    fn models(&self) -> &ModelPair;

    /// Whether the credentials needed to connect are present
    fn is_configured(&self) -> bool;

    /// Build the vendor client. `Ok(None)` means "not configured" and is
    /// not an error.
    async fn connect(
      &self
    , timeout: Duration
    ) -> Result<Option<Self::Client>, Error>;

    fn build_request(&self, call: &VendorCall<'_>) -> Self::Request;

    async fn send(
      &self
    , client: &Self::Client
    , request: &Self::Request
    ) -> Result<Self::Response, Error>;

    /// Raw text of the response, if any
    fn extract_text(&self, response: &Self::Response) -> Option<String>;

    fn token_usage(&self, _response: &Self::Response) -> Option<TokenUsage>
    {   None
    }

    /// Whether `<think>` blocks are removed from the output
    fn strips_thinking(&self) -> bool
    {   false
    }

    /// Fails when the provider cannot enumerate models at all
    fn check_model_listing(&self) -> Result<(), Error>
    {   Ok(())
    }

    async fn list_models(
      &self
    , client: &Self::Client
    ) -> Result<Vec<String>, Error>;
}
