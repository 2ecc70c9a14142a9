use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::mpsc;

use crate::config::{ConfigSource, ExecutionConfig, ProviderConfig};
use crate::error::Error;
use crate::factory::create_llm_service;
use crate::request::{ConversationTurn, ExecutionResult, PromptOptions, PromptRequest};
use crate::service::LlmService;
use crate::GatewayFoot;

/// Backend state: the active service and what is needed to rebuild it
pub struct GatewayBackendState
{   pub service: Arc<dyn LlmService>
  , pub source: Arc<dyn ConfigSource>
  , pub execution: ExecutionConfig
}

impl GatewayBackendState
{   pub fn new(
      service: Arc<dyn LlmService>
    , source: Arc<dyn ConfigSource>
    , execution: ExecutionConfig
    ) -> Self
    {   debug!("Initializing GatewayBackendState for {}", service.provider());
        GatewayBackendState
        {   service
          , source
          , execution
        }
    }

    /// Replace the active service with one built from `config`.
    pub fn set_provider_config(&mut self, config: ProviderConfig)
    {   self.service = create_llm_service(
          config,
          self.source.clone(),
          self.execution.clone()
        );
        info!("Gateway now using provider {}", self.service.provider());
    }
}

/// Public API for the gateway backend - owns the task
pub struct GatewayBackend
{   hand: crate::GatewayHand
  , _task_handle: tokio::task::JoinHandle<()>
}

fn disconnected<T>(_: T) -> Error
{   error!("Backend channel closed");
    Error::Disconnected
}

impl GatewayBackend
{   /// Spawn a backend around a service built from `config`.
    pub fn new(
      config: ProviderConfig
    , source: Arc<dyn ConfigSource>
    , execution: ExecutionConfig
    ) -> Self
    {   let service = create_llm_service(config, source.clone(), execution.clone());
        Self::with_service(service, source, execution)
    }

    /// Spawn a backend around an existing service.
    /// Returns immediately - spawns background task
    pub fn with_service(
      service: Arc<dyn LlmService>
    , source: Arc<dyn ConfigSource>
    , execution: ExecutionConfig
    ) -> Self
    {   debug!("Creating GatewayBackend with task ownership");

        let (execute_prompt_tx, execute_prompt_rx)
          = mpsc::unbounded_channel();
        let (get_models_tx, get_models_rx)
          = mpsc::unbounded_channel();
        let (is_configured_tx, is_configured_rx)
          = mpsc::unbounded_channel();
        let (set_provider_config_tx, set_provider_config_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::GatewayHand
        {   execute_prompt_tx
          , get_models_tx
          , is_configured_tx
          , set_provider_config_tx
          , kill_process_tx
        };

        let foot = crate::GatewayFoot
        {   execute_prompt_rx
          , get_models_rx
          , is_configured_rx
          , set_provider_config_rx
          , kill_process_rx
        };

        let state = GatewayBackendState::new(service, source, execution);
        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, state).await
        });

        GatewayBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a request - returns almost immediately
    pub fn execute(
      &self
    , request: PromptRequest
    ) -> Result<mpsc::UnboundedReceiver<crate::ExecutePromptReply>, Error>
    {   debug!("execute queuing command");
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();

        self.hand.execute_prompt_tx
          .send(crate::ExecutePromptArgs { request, reply: reply_tx })
          .map_err(disconnected)?;

        Ok(reply_rx)
    }

    /// Run a single prompt and wait for its result
    pub async fn execute_prompt(
      &self
    , prompt: impl Into<String>
    , options: PromptOptions
    ) -> Result<ExecutionResult, Error>
    {   let request = PromptRequest::text(prompt).with_options(options);
        let mut reply_rx = self.execute(request)?;
        reply_rx.recv().await.ok_or(Error::Disconnected)
    }

    /// Run a conversation and wait for its result
    pub async fn execute_prompt_with_history(
      &self
    , turns: Vec<ConversationTurn>
    , options: PromptOptions
    ) -> Result<ExecutionResult, Error>
    {   let request = PromptRequest::conversation(turns).with_options(options);
        let mut reply_rx = self.execute(request)?;
        reply_rx.recv().await.ok_or(Error::Disconnected)
    }

    pub async fn get_models(&self) -> Result<Vec<String>, Error>
    {   debug!("get_models queuing command");
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();

        self.hand.get_models_tx
          .send(crate::GetModelsArgs { reply: reply_tx })
          .map_err(disconnected)?;

        reply_rx.recv().await.ok_or(Error::Disconnected)?
    }

    pub async fn is_configured(&self) -> Result<bool, Error>
    {   let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();

        self.hand.is_configured_tx
          .send(crate::IsConfiguredArgs { reply: reply_tx })
          .map_err(disconnected)?;

        reply_rx.recv().await.ok_or(Error::Disconnected)
    }

    /// Switch provider. Requests already in flight finish on the old
    /// service.
    pub async fn set_provider_config(
      &self
    , config: ProviderConfig
    ) -> Result<(), Error>
    {   debug!("set_provider_config queuing {}", config.provider());
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();

        self.hand.set_provider_config_tx
          .send(crate::SetProviderConfigArgs { config, reply: reply_tx })
          .map_err(disconnected)?;

        reply_rx.recv().await.ok_or(Error::Disconnected)?
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self) -> Result<(), Error>
    {   debug!("Shutting down GatewayBackend");
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();

        self.hand.kill_process_tx
          .send(crate::KillProcessArgs { reply: reply_tx })
          .map_err(disconnected)?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend exited without confirming shutdown");
            Err(Error::Disconnected)
        }
    }
}

/// Main backend event loop
///
/// tokio::select! only routes. Prompt and model-listing work is spawned
/// with a clone of the current service so a slow vendor never blocks the
/// loop.
async fn run_backend_loop(
  foot: GatewayFoot
, mut state: GatewayBackendState
)
{   debug!("Starting GatewayBackend event loop");
    let GatewayFoot
    {   mut execute_prompt_rx
      , mut get_models_rx
      , mut is_configured_rx
      , mut set_provider_config_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = execute_prompt_rx.recv() => {
          debug!("Received ExecutePrompt");
          let service = state.service.clone();
          tokio::spawn(async move {
            let result = service.execute(&cmd.request).await;
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = get_models_rx.recv() => {
          debug!("Received GetModels");
          let service = state.service.clone();
          tokio::spawn(async move {
            let _ = cmd.reply.send(service.get_models().await);
          });
        }
      , Some(cmd) = is_configured_rx.recv() => {
          debug!("Received IsConfigured");
          let service = state.service.clone();
          tokio::spawn(async move {
            let _ = cmd.reply.send(service.is_configured().await);
          });
        }
      , Some(cmd) = set_provider_config_rx.recv() => {
          debug!("Received SetProviderConfig");
          state.set_provider_config(cmd.config);
          let _ = cmd.reply.send(Ok(()));
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("GatewayBackend shutting down");
          break;
        }
      , else => {
          debug!("All GatewayBackend channels closed");
          break;
        }
      }
    }
}
