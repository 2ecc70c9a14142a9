use std::sync::Arc;

use allm_gateway::config::{OpenAiConfig, StaticConfigSource};
use allm_gateway::{
  ConversationTurn, Error, ExecutionConfig, GatewayBackend, PromptData, PromptOptions,
  PromptRequest, ProviderConfig,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn openai_server(key: &str, content: &str) -> MockServer
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("authorization", format!("Bearer {}", key).as_str()))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
      })))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/models"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": [{ "id": "gpt-5.1" }]
      })))
      .mount(&server)
      .await;
    server
}

fn openai_config(key: &str, server: &MockServer) -> ProviderConfig
{   ProviderConfig::OpenAi(OpenAiConfig
    {   api_key: key.to_string()
      , api_base: Some(server.uri())
      , ..Default::default()
    })
}

fn backend(config: ProviderConfig) -> GatewayBackend
{   GatewayBackend::new(
      config,
      Arc::new(StaticConfigSource::new()),
      ExecutionConfig::default()
    )
}

#[tokio::test]
async fn test_backend_executes_prompts()
{   let server = openai_server("sk-one", "from backend").await;
    let backend = backend(openai_config("sk-one", &server));

    let result = assert_ok!(backend.execute_prompt("hi", PromptOptions::default()).await);
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.data, Some(PromptData::Text("from backend".to_string())));

    let result = assert_ok!(
      backend
        .execute_prompt_with_history(vec![ConversationTurn::user("hi")], PromptOptions::fast())
        .await
    );
    assert!(result.success);
    assert_eq!(result.model, "gpt-4.1-mini");

    assert!(assert_ok!(backend.is_configured().await));
    assert_eq!(assert_ok!(backend.get_models().await), vec!["gpt-5.1"]);

    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_queued_requests_complete()
{   let server = openai_server("sk-one", "queued").await;
    let backend = backend(openai_config("sk-one", &server));

    let mut receivers = Vec::new();
    for i in 0..5
    {   let request = PromptRequest::text(format!("prompt {}", i));
        receivers.push(assert_ok!(backend.execute(request)));
    }
    for mut rx in receivers
    {   let result = rx.recv().await.expect("reply");
        assert!(result.success);
    }

    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_switches_provider()
{   let first = openai_server("sk-one", "first").await;
    let second = openai_server("sk-two", "second").await;
    let backend = backend(openai_config("sk-one", &first));

    let result = assert_ok!(backend.execute_prompt("hi", PromptOptions::default()).await);
    assert_eq!(result.data, Some(PromptData::Text("first".to_string())));

    assert_ok!(backend.set_provider_config(openai_config("sk-two", &second)).await);

    let result = assert_ok!(backend.execute_prompt("hi", PromptOptions::default()).await);
    assert_eq!(result.data, Some(PromptData::Text("second".to_string())));

    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_unconfigured_service()
{   let backend = backend(ProviderConfig::OpenAi(OpenAiConfig::default()));

    assert!(!assert_ok!(backend.is_configured().await));
    let result = assert_ok!(backend.execute_prompt("hi", PromptOptions::default()).await);
    assert_eq!(result.error.as_deref(), Some("OpenAI not configured"));

    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_reports_get_models_errors()
{   let backend = backend(ProviderConfig::AzureOpenAi(Default::default()));

    let error = assert_err!(backend.get_models().await);
    assert!(matches!(error, Error::NotImplemented(_)));

    assert_ok!(backend.shutdown().await);
}
