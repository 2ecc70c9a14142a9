use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use allm_gateway::config::{
  StaticConfigSource, ANTHROPIC_API_BASE, ANTHROPIC_API_KEY, DEFAULT_PROVIDER_KEY,
  OPENAI_API_BASE, OPENAI_API_KEY,
};
use allm_gateway::providers::packmind::UNKNOWN_MODEL;
use allm_gateway::providers::PackmindService;
use allm_gateway::{ConfigSource, Error, LlmService, PromptData, PromptOptions, Provider};
use async_trait::async_trait;
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn openai_server() -> MockServer
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("authorization", "Bearer sk-openai"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": "delegated" } }]
      })))
      .mount(&server)
      .await;
    server
}

fn openai_source(server: &MockServer) -> StaticConfigSource
{   StaticConfigSource::new()
      .with(OPENAI_API_KEY, "sk-openai")
      .with(OPENAI_API_BASE, server.uri())
}

#[tokio::test]
async fn test_no_preference_delegates_to_openai()
{   let server = openai_server().await;
    let proxy = PackmindService::new(Arc::new(openai_source(&server)));

    assert_eq!(proxy.delegate_provider(), None);
    let result = proxy.execute_prompt("hi", &PromptOptions::default()).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.data, Some(PromptData::Text("delegated".to_string())));
    assert_eq!(result.model, "gpt-5.1");
    assert_eq!(proxy.delegate_provider(), Some(Provider::OpenAi));
    assert_eq!(proxy.provider(), Provider::Packmind);
}

#[tokio::test]
async fn test_self_reference_and_garbage_fall_back_to_openai()
{   for setting in ["packmind", "not-a-provider", "  "]
    {   let source = StaticConfigSource::new().with(DEFAULT_PROVIDER_KEY, setting);
        let proxy = PackmindService::new(Arc::new(source));
        assert_eq!(proxy.configured_provider().await, Provider::OpenAi, "{:?}", setting);
    }
}

#[tokio::test]
async fn test_anthropic_preference()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/v1/messages"))
      .and(header("x-api-key", "sk-ant"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "content": [{ "type": "text", "text": "from claude" }]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let source = StaticConfigSource::new()
      .with(DEFAULT_PROVIDER_KEY, "anthropic")
      .with(ANTHROPIC_API_KEY, "sk-ant")
      .with(ANTHROPIC_API_BASE, server.uri());
    let proxy = PackmindService::new(Arc::new(source));

    let result = proxy.execute_prompt("hi", &PromptOptions::default()).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.model, "claude-sonnet-4-5-20250929");
    assert_eq!(proxy.delegate_provider(), Some(Provider::Anthropic));
    assert!(proxy.is_configured().await);
}

#[tokio::test]
async fn test_missing_key_is_graceful_failure()
{   let proxy = PackmindService::new(Arc::new(StaticConfigSource::new()));

    let result = proxy.execute_prompt("hi", &PromptOptions::default()).await;
    assert!(!result.success);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.model, UNKNOWN_MODEL);
    assert_eq!(result.error.as_deref(), Some("OPENAI_API_KEY not found in configuration"));

    assert!(!proxy.is_configured().await);
    assert!(assert_ok!(proxy.get_models().await).is_empty());
    assert_eq!(proxy.delegate_provider(), None);
}

#[tokio::test]
async fn test_unsupported_delegate_is_graceful_failure()
{   let source = StaticConfigSource::new()
      .with(DEFAULT_PROVIDER_KEY, "azure-openai")
      .with(OPENAI_API_KEY, "sk-openai");
    let proxy = PackmindService::new(Arc::new(source));

    let result = proxy
      .execute_prompt_with_history(&[], &PromptOptions::default())
      .await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("not supported"));
}

/// Source whose values can change after the proxy is built
#[derive(Default)]
struct MutableSource
{   values: RwLock<HashMap<String, String>>
}

#[async_trait]
impl ConfigSource for MutableSource
{   async fn get_config(&self, key: &str) -> Result<Option<String>, Error>
    {   Ok(self.values.read().unwrap().get(key).cloned())
    }
}

#[tokio::test]
async fn test_failed_resolution_is_retried()
{   let server = openai_server().await;
    let source = Arc::new(MutableSource::default());
    let proxy = PackmindService::new(source.clone());

    let first = proxy.execute_prompt("hi", &PromptOptions::default()).await;
    assert!(!first.success);

    {   let mut values = source.values.write().unwrap();
        values.insert(OPENAI_API_KEY.to_string(), "sk-openai".to_string());
        values.insert(OPENAI_API_BASE.to_string(), server.uri());
    }

    let second = proxy.execute_prompt("hi", &PromptOptions::default()).await;
    assert!(second.success, "{:?}", second.error);
}

/// Source that fails for the provider preference only
struct FlakySource
{   inner: StaticConfigSource
}

#[async_trait]
impl ConfigSource for FlakySource
{   async fn get_config(&self, key: &str) -> Result<Option<String>, Error>
    {   if key == DEFAULT_PROVIDER_KEY
        {   return Err(Error::Other("config backend unavailable".to_string()));
        }
        self.inner.get_config(key).await
    }
}

#[tokio::test]
async fn test_preference_lookup_error_falls_back_to_openai()
{   let server = openai_server().await;
    let proxy = PackmindService::new(Arc::new(FlakySource { inner: openai_source(&server) }));

    let result = proxy.execute_prompt("hi", &PromptOptions::default()).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(proxy.delegate_provider(), Some(Provider::OpenAi));
}
