//! Live provider tests. Run with `cargo test -- --ignored` and the
//! relevant `*_API_KEY` variables exported.

use std::sync::Arc;

use allm_gateway::config::{
  AnthropicConfig, ConfigSource, EnvConfigSource, GeminiConfig, OpenAiConfig,
  ANTHROPIC_API_KEY, GEMINI_API_KEY, OPENAI_API_KEY,
};
use allm_gateway::connection::test_connection;
use allm_gateway::providers::PackmindService;
use allm_gateway::{
  create_llm_service, ConversationTurn, ExecutionConfig, LlmService, PromptOptions,
  ProviderConfig,
};

/// Reads a key from the environment, `None` means skip
async fn live_key(name: &str) -> Option<String>
{   match EnvConfigSource.get_config(name).await
    {   Ok(Some(key)) => Some(key)
      , _ => {
          println!("Skipping test: {} not set", name);
          None
        }
    }
}

async fn live_service(config: ProviderConfig) -> Arc<dyn LlmService>
{   create_llm_service(config, Arc::new(EnvConfigSource), ExecutionConfig::default())
}

async fn say_hello(service: &dyn LlmService)
{   let result = service
      .execute_prompt("Say hello", &PromptOptions::default().with_retry_attempts(2))
      .await;
    println!("Response from {}: {:?}", result.model, result.data);
    assert!(result.success, "{:?}", result.error);
    assert!(result.data.as_ref().and_then(|d| d.as_text()).is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
#[ignore]
async fn test_openai_live_prompt()
{   let Some(api_key) = live_key(OPENAI_API_KEY).await else { return };
    let service = live_service(ProviderConfig::OpenAi(OpenAiConfig
    {   api_key
      , ..Default::default()
    })).await;
    say_hello(service.as_ref()).await;

    let models = service.get_models().await;
    assert!(models.is_ok_and(|m| !m.is_empty()));
}

#[tokio::test]
#[ignore]
async fn test_anthropic_live_conversation()
{   let Some(api_key) = live_key(ANTHROPIC_API_KEY).await else { return };
    let service = live_service(ProviderConfig::Anthropic(AnthropicConfig
    {   api_key
      , ..Default::default()
    })).await;

    let turns = vec![
      ConversationTurn::system("Answer with a single word.")
    , ConversationTurn::user("What colour is the sky on a clear day?")
    ];
    let result = service.execute_prompt_with_history(&turns, &PromptOptions::fast()).await;
    assert!(result.success, "{:?}", result.error);
}

#[tokio::test]
#[ignore]
async fn test_gemini_live_prompt()
{   let Some(api_key) = live_key(GEMINI_API_KEY).await else { return };
    let service = live_service(ProviderConfig::Gemini(GeminiConfig
    {   api_key
      , ..Default::default()
    })).await;
    say_hello(service.as_ref()).await;
}

#[tokio::test]
#[ignore]
async fn test_packmind_live_delegation()
{   if live_key(OPENAI_API_KEY).await.is_none()
    {   return;
    }
    let proxy = PackmindService::new(Arc::new(EnvConfigSource));
    say_hello(&proxy).await;
    assert!(proxy.delegate_provider().is_some());
}

#[tokio::test]
#[ignore]
async fn test_openai_live_connection_check()
{   let Some(api_key) = live_key(OPENAI_API_KEY).await else { return };
    let config = ProviderConfig::OpenAi(OpenAiConfig
    {   api_key
      , fastest_model: Some("gpt-4.1-mini".to_string())
      , ..Default::default()
    });

    let result = test_connection(config, Arc::new(EnvConfigSource), ExecutionConfig::default()).await;
    println!("{}", serde_json::to_string_pretty(&result).unwrap());
    assert!(result.overall_success);
    assert!(result.fast_model.is_some());
}
