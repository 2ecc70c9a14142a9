//! Gateway surface exposed to the rest of the system

use async_trait::async_trait;

use crate::error::Error;
use crate::request::{
  ConversationTurn, ExecutionResult, Prompt, PromptOptions, PromptRequest,
};
use crate::Provider;

/// Uniform LLM service.
///
/// Vendor failures never escape as `Err`: they come back as an
/// `ExecutionResult` with `success == false`. Only `get_models` may fail,
/// and only for providers that cannot enumerate models at all.
#[async_trait]
pub trait LlmService: Send + Sync
{   /// Provider tag this service was built for
    fn provider(&self) -> Provider;

    async fn execute_prompt(
      &self
    , prompt: &str
    , options: &PromptOptions
    ) -> ExecutionResult;

    async fn execute_prompt_with_history(
      &self
    , turns: &[ConversationTurn]
    , options: &PromptOptions
    ) -> ExecutionResult;

    /// Best-effort model listing
    async fn get_models(&self) -> Result<Vec<String>, Error>;

    async fn is_configured(&self) -> bool;

    /// Route a request to the matching entry point.
    async fn execute(&self, request: &PromptRequest) -> ExecutionResult
    {   match &request.prompt
        {   Prompt::Text(text) => {
              self.execute_prompt(text, &request.options).await
            }
          , Prompt::Conversation(turns) => {
              self.execute_prompt_with_history(turns, &request.options)
                .await
            }
        }
    }
}
