use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use allm_gateway::config::{
  AnthropicConfig, OpenAiConfig, StaticConfigSource, OPENAI_API_BASE,
  OPENAI_API_KEY,
};
use allm_gateway::connection::{
  run_connection_test, status_code, test_connection, test_saved_configuration, ConnectionError,
  NO_CONFIGURATION_MESSAGE,
};
use allm_gateway::store::{CachedConfigurationRepository, ConfigurationStore, MemoryCache, SecretCipher};
use allm_gateway::{
  ConversationTurn, Error, ErrorKind, ExecutionConfig, ExecutionResult, LlmService, Performance,
  PromptData, PromptOptions, Provider, ProviderConfig,
};
use async_trait::async_trait;
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Service returning canned results and recording requested tiers
struct CannedService
{   results: Mutex<VecDeque<ExecutionResult>>
  , tiers: Mutex<Vec<Option<Performance>>>
}

impl CannedService
{   fn new(results: Vec<ExecutionResult>) -> Self
    {   CannedService
        {   results: Mutex::new(results.into())
          , tiers: Mutex::new(Vec::new())
        }
    }
}

#[async_trait]
impl LlmService for CannedService
{   fn provider(&self) -> Provider
    {   Provider::OpenAi
    }

    async fn execute_prompt(&self, _prompt: &str, options: &PromptOptions) -> ExecutionResult
    {   self.tiers.lock().unwrap().push(options.performance);
        self.results.lock().unwrap()
          .pop_front()
          .unwrap_or_else(|| ExecutionResult::failed("script exhausted", 1, "none"))
    }

    async fn execute_prompt_with_history(
      &self
    , _turns: &[ConversationTurn]
    , _options: &PromptOptions
    ) -> ExecutionResult
    {   unreachable!("connection tests only send single prompts")
    }

    async fn get_models(&self) -> Result<Vec<String>, Error>
    {   Ok(Vec::new())
    }

    async fn is_configured(&self) -> bool
    {   true
    }
}

fn ok(model: &str) -> ExecutionResult
{   ExecutionResult::succeeded(PromptData::Text("Hello!".to_string()), 1, model, None)
}

fn openai_pair(model: &str, fast: Option<&str>) -> ProviderConfig
{   ProviderConfig::OpenAi(OpenAiConfig
    {   api_key: "test-key".to_string()
      , model: Some(model.to_string())
      , fastest_model: fast.map(str::to_string)
      , ..Default::default()
    })
}

#[tokio::test]
async fn test_both_models_succeed()
{   let service = CannedService::new(vec![ok("gpt-4"), ok("gpt-4-mini")]);
    let result = run_connection_test(&service, &openai_pair("gpt-4", Some("gpt-4-mini"))).await;

    assert!(result.overall_success);
    assert!(result.has_configuration);
    assert!(result.standard_model.success);
    assert_eq!(result.fast_model.as_ref().map(|f| f.model.as_str()), Some("gpt-4-mini"));
    assert_eq!(
      *service.tiers.lock().unwrap(),
      vec![Some(Performance::Standard), Some(Performance::Fast)]
    );
}

#[tokio::test]
async fn test_same_or_missing_fast_model_is_not_tested()
{   let service = CannedService::new(vec![ok("gpt-4")]);
    let result = run_connection_test(&service, &openai_pair("gpt-4", Some("gpt-4"))).await;
    assert!(result.fast_model.is_none());
    assert!(result.overall_success);

    let service = CannedService::new(vec![ok("claude-sonnet-4-5-20250929")]);
    let config = ProviderConfig::Anthropic(AnthropicConfig
    {   api_key: "test-key".to_string()
      , model: Some("claude-sonnet-4-5-20250929".to_string())
      , ..Default::default()
    });
    let result = run_connection_test(&service, &config).await;
    assert!(result.fast_model.is_none());
    assert_eq!(result.provider, Provider::Anthropic);
    assert_eq!(service.tiers.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failure_classification()
{   let cases = [
      ("Unauthorized (401)", ErrorKind::AuthenticationError, Some(401))
    , ("Rate limit exceeded (429)", ErrorKind::RateLimit, Some(429))
    , ("Network timeout occurred", ErrorKind::NetworkError, None)
    , ("AI prompt execution failed after 1 attempts: HTTP 503: overloaded", ErrorKind::ApiError, Some(503))
    , ( "AI prompt execution failed after 1 attempts: HTTP 429: Rate limit reached on tokens per min. Limit 30000, Used 24010, Requested 9000."
      , ErrorKind::RateLimit
      , Some(429)
      )
    , ( "AI prompt execution failed after 1 attempts: HTTP 401: key revoked at rate limit boundary"
      , ErrorKind::AuthenticationError
      , Some(401)
      )
    ];

    for (message, kind, status) in cases
    {   let service = CannedService::new(vec![ExecutionResult::failed(message, 1, "gpt-4")]);
        let result = run_connection_test(&service, &openai_pair("gpt-4", None)).await;

        assert!(!result.overall_success);
        let error = result.standard_model.error.expect("error");
        assert_eq!(error.kind, kind, "{}", message);
        assert_eq!(error.message, message);
        assert_eq!(error.status_code, status, "{}", message);
    }
}

#[tokio::test]
async fn test_fast_failure_fails_overall()
{   let service = CannedService::new(vec![
      ok("gpt-4"),
      ExecutionResult::failed("Model not available", 2, "gpt-4-mini"),
    ]);
    let result = run_connection_test(&service, &openai_pair("gpt-4", Some("gpt-4-mini"))).await;

    assert!(result.standard_model.success);
    assert!(!result.overall_success);
    let fast = result.fast_model.expect("fast result");
    assert_eq!(fast.error.map(|e| e.kind), Some(ErrorKind::ApiError));
}

#[test]
fn test_status_code_extraction()
{   assert_eq!(status_code("HTTP 401: bad key"), Some(401));
    assert_eq!(status_code("Unauthorized (401)"), Some(401));
    assert_eq!(status_code("took 4010 ms"), None);
    assert_eq!(status_code("plain failure"), None);

    let error = ConnectionError::from_message("HTTP 429: Too Many Requests");
    assert_eq!(serde_json::to_value(&error).unwrap(), json!({
      "type": "RATE_LIMIT",
      "message": "HTTP 429: Too Many Requests",
      "statusCode": 429
    }));
}

async fn openai_server(status: u16) -> MockServer
{   let server = MockServer::start().await;
    let response = if status == 200
    {   ResponseTemplate::new(200).set_body_json(json!({
          "choices": [{ "message": { "role": "assistant", "content": "hello" } }]
        }))
    } else
    {   ResponseTemplate::new(status).set_body_json(json!({
          "error": { "message": "Incorrect API key provided" }
        }))
    };
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(response)
      .mount(&server)
      .await;
    server
}

#[tokio::test]
async fn test_connection_end_to_end()
{   let server = openai_server(401).await;
    let config = ProviderConfig::OpenAi(OpenAiConfig
    {   api_key: "sk-bad".to_string()
      , api_base: Some(server.uri())
      , ..Default::default()
    });

    let result = test_connection(
      config,
      Arc::new(StaticConfigSource::new()),
      ExecutionConfig::default()
    ).await;

    assert!(!result.overall_success);
    let error = result.standard_model.error.expect("error");
    assert_eq!(error.kind, ErrorKind::AuthenticationError);
    assert_eq!(error.status_code, Some(401));
    assert_eq!(result.standard_model.model, "gpt-5.1");
}

struct PlainCipher;

impl SecretCipher for PlainCipher
{   fn encrypt(&self, plaintext: &str) -> Result<String, Error>
    {   Ok(plaintext.chars().rev().collect())
    }

    fn decrypt(&self, payload: &str) -> Result<String, Error>
    {   Ok(payload.chars().rev().collect())
    }
}

fn store() -> CachedConfigurationRepository
{   CachedConfigurationRepository::new(Arc::new(MemoryCache::new()), Arc::new(PlainCipher))
}

#[tokio::test]
async fn test_saved_configuration_is_tested()
{   let server = openai_server(200).await;
    let store = store();
    let config = ProviderConfig::OpenAi(OpenAiConfig
    {   api_key: "sk-good".to_string()
      , api_base: Some(server.uri())
      , ..Default::default()
    });
    assert_ok!(store.save("org-1", config).await);

    let result = test_saved_configuration(
      &store,
      "org-1",
      Arc::new(StaticConfigSource::new()),
      ExecutionConfig::default()
    ).await;

    assert!(result.has_configuration);
    assert!(result.overall_success);
    assert_eq!(result.provider, Provider::OpenAi);
}

#[tokio::test]
async fn test_no_saved_configuration_without_default_provider()
{   let result = test_saved_configuration(
      &store(),
      "org-2",
      Arc::new(StaticConfigSource::new()),
      ExecutionConfig::default()
    ).await;

    assert!(!result.has_configuration);
    assert!(!result.overall_success);
    assert_eq!(
      result.standard_model.error.map(|e| e.message).as_deref(),
      Some(NO_CONFIGURATION_MESSAGE)
    );
}

#[tokio::test]
async fn test_no_saved_configuration_uses_default_provider()
{   let server = openai_server(200).await;
    let source = StaticConfigSource::new()
      .with(OPENAI_API_KEY, "sk-platform")
      .with(OPENAI_API_BASE, server.uri());

    let result = test_saved_configuration(
      &store(),
      "org-3",
      Arc::new(source),
      ExecutionConfig::default()
    ).await;

    assert!(!result.has_configuration);
    assert!(result.overall_success);
    assert_eq!(result.provider, Provider::Packmind);
    assert!(result.fast_model.is_none());
}
