//! Shared prompt execution engine
//!
//! One engine drives every vendor adapter:
//!
//! ```text
//! UNINITIALIZED -> INITIALIZING -> CLIENT_READY | CLIENT_ABSENT
//! CLIENT_ABSENT: single-shot "not configured" failure
//! CLIENT_READY:  ATTEMPTING -> SUCCEEDED
//!                           -> RETRYING -> ATTEMPTING
//!                           -> EXHAUSTED
//! ```
//!
//! Only the client handle outlives a call. It is built at most once per
//! executor; concurrent first callers wait on the same initialization.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::sync::OnceCell;

use crate::config::ExecutionConfig;
use crate::error::{classify, Error};
use crate::normalize::normalize;
use crate::providers::{ProviderAdapter, VendorCall};
use crate::request::{ConversationTurn, ExecutionResult, PromptOptions};
use crate::retry::RetryPolicy;
use crate::service::LlmService;
use crate::Provider;

/// Which public entry point is running; only affects log and error text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation
{   Prompt
  , PromptWithHistory
}

impl Operation
{   pub fn label(&self) -> &'static str
    {   match self
        {   Operation::Prompt => "AI prompt execution"
          , Operation::PromptWithHistory => "AI prompt with history execution"
        }
    }
}

/// Retry engine bound to one vendor adapter
pub struct PromptExecutor<A: ProviderAdapter>
{   adapter: A
  , config: ExecutionConfig
  , client: OnceCell<Option<A::Client>>
}

impl<A: ProviderAdapter> PromptExecutor<A>
{   pub fn new(adapter: A) -> Self
    {   Self::with_config(adapter, ExecutionConfig::default())
    }

    pub fn with_config(adapter: A, config: ExecutionConfig) -> Self
    {   info!("{} initialized", adapter.service_name());
        PromptExecutor
        {   adapter
          , config
          , client: OnceCell::new()
        }
    }

    pub fn adapter(&self) -> &A
    {   &self.adapter
    }

    pub fn config(&self) -> &ExecutionConfig
    {   &self.config
    }

    /// Lazily build the vendor client.
    ///
    /// Missing credentials and construction failures both leave the
    /// client unset; neither is retried for the lifetime of the executor.
    async fn client(&self) -> Option<&A::Client>
    {   let name = self.adapter.service_name();
        self.client
          .get_or_init(|| async {
            debug!("Initializing {} client", name);
            match self.adapter.connect(self.config.request_timeout()).await
            {   Ok(Some(client)) => {
                  info!("{} client initialized successfully", name);
                  Some(client)
                }
              , Ok(None) => {
                  warn!(
                    "{} credentials not provided - AI features will be disabled",
                    name
                  );
                  None
                }
              , Err(e) => {
                  error!("Failed to initialize {} client: {}", name, e);
                  None
                }
            }
          })
          .await
          .as_ref()
    }

    /// Run the bounded retry loop for one call.
    pub async fn run(
      &self
    , operation: Operation
    , turns: &[ConversationTurn]
    , options: &PromptOptions
    ) -> ExecutionResult
    {   let name = self.adapter.service_name();
        info!(
          "Executing {} on {} ({} turns, max_tokens={:?})",
          operation.label(), name, turns.len(), options.max_tokens
        );

        let client = self.client().await;
        let model = self.adapter.models().select(options).to_string();

        let Some(client) = client else {
          warn!("{} client not available - returning graceful failure", name);
          return ExecutionResult::failed(
            format!("{} not configured", name),
            1,
            model
          );
        };

        let policy = RetryPolicy::for_call(
          options.retry_attempts,
          self.config.default_retry_attempts
        );
        let call = VendorCall { model: &model, turns, options };
        let mut last_error: Option<Error> = None;
        let mut calls = 0;

        for attempt in 1..=policy.max_attempts
        {   calls = attempt;
            info!(
              "Sending request to {} (attempt {}, model {})",
              name, attempt, model
            );

            match self.attempt(client, &call, attempt).await
            {   Ok(result) => {
                  info!(
                    "{} succeeded on attempt {}",
                    operation.label(), attempt
                  );
                  return result;
                }
              , Err(e) => {
                  let kind = classify(&e);
                  let will_retry = policy.allows_retry(kind, attempt);
                  warn!(
                    "{} failed (attempt {}, kind {}, will_retry {}): {}",
                    operation.label(), attempt, kind, will_retry, e
                  );
                  last_error = Some(e);
                  if !will_retry
                  {   break;
                  }
                  debug!("Retrying immediately after attempt {}", attempt);
                }
            }
        }

        // vendor calls actually made, not the budget
        let message = format!(
          "{} failed after {} attempts: {}",
          operation.label(),
          calls,
          last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string())
        );
        error!("{} failed permanently: {}", operation.label(), message);
        ExecutionResult::failed(message, calls, model)
    }

    async fn attempt(
      &self
    , client: &A::Client
    , call: &VendorCall<'_>
    , attempt: u32
    ) -> Result<ExecutionResult, Error>
    {   let request = self.adapter.build_request(call);
        log::trace!("{} request: {:?}", self.adapter.service_name(), request);

        let response = self.adapter.send(client, &request).await?;
        let data = normalize(
          self.adapter.extract_text(&response),
          self.adapter.service_name(),
          self.adapter.strips_thinking()
        )?;

        Ok(ExecutionResult::succeeded(
          data,
          attempt,
          call.model,
          self.adapter.token_usage(&response)
        ))
    }
}

#[async_trait]
impl<A: ProviderAdapter> LlmService for PromptExecutor<A>
{   fn provider(&self) -> Provider
    {   self.adapter.provider()
    }

    async fn execute_prompt(
      &self
    , prompt: &str
    , options: &PromptOptions
    ) -> ExecutionResult
    {   let turns = [ConversationTurn::user(prompt)];
        self.run(Operation::Prompt, &turns, options).await
    }

    async fn execute_prompt_with_history(
      &self
    , turns: &[ConversationTurn]
    , options: &PromptOptions
    ) -> ExecutionResult
    {   self.run(Operation::PromptWithHistory, turns, options).await
    }

    async fn get_models(&self) -> Result<Vec<String>, Error>
    {   let name = self.adapter.service_name();
        self.adapter.check_model_listing()?;

        let Some(client) = self.client().await else {
          debug!("{} not configured, no models to list", name);
          return Ok(Vec::new());
        };

        match self.adapter.list_models(client).await
        {   Ok(models) => {
              debug!("Retrieved {} models from {}", models.len(), name);
              Ok(models)
            }
          , Err(e) => {
              warn!("Failed to list {} models: {}", name, e);
              Ok(Vec::new())
            }
        }
    }

    async fn is_configured(&self) -> bool
    {   self.adapter.is_configured()
    }
}
