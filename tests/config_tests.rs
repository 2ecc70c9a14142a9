use std::sync::Arc;

use allm_gateway::config::{
  AzureOpenAiConfig, ConfigSource, EnvConfigSource, GeminiConfig, StaticConfigSource,
};
use allm_gateway::factory::create_llm_service_from_json;
use allm_gateway::{
  create_llm_service, Error, ExecutionConfig, GatewayConfig, LlmService, Provider,
  ProviderConfig,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_provider_config_tags()
{   let config = assert_ok!(ProviderConfig::from_json(json!({
      "provider": "azure-openai",
      "endpoint": "https://example.openai.azure.com",
      "apiKey": "az",
      "model": "gpt-4-deployment",
      "fastestModel": "gpt-35-turbo-deployment"
    })));
    assert_eq!(config, ProviderConfig::AzureOpenAi(AzureOpenAiConfig
    {   endpoint: "https://example.openai.azure.com".to_string()
      , api_key: "az".to_string()
      , model: "gpt-4-deployment".to_string()
      , fastest_model: Some("gpt-35-turbo-deployment".to_string())
      , api_version: None
    }));
    assert_eq!(config.provider(), Provider::AzureOpenAi);

    let config = assert_ok!(ProviderConfig::from_json(json!({ "provider": "packmind" })));
    assert_eq!(config.provider(), Provider::Packmind);
    assert_eq!(config.secret(), None);

    let config = assert_ok!(ProviderConfig::from_json(json!({
      "provider": "openai-compatible",
      "llmEndpoint": "http://localhost:11434/v1",
      "llmApiKey": "ollama",
      "model": "llama3"
    })));
    assert_eq!(config.secret(), Some("ollama"));
}

#[test]
fn test_unknown_provider_tag()
{   let error = assert_err!(ProviderConfig::from_json(json!({ "provider": "mistral" })));
    assert_eq!(error, Error::UnknownProvider("mistral".to_string()));

    let error = assert_err!(ProviderConfig::from_json(json!({ "apiKey": "x" })));
    assert!(matches!(error, Error::UnknownProvider(_)));
}

#[test]
fn test_provider_round_trip_names()
{   for provider in [
      Provider::OpenAi,
      Provider::Anthropic,
      Provider::Gemini,
      Provider::OpenAiCompatible,
      Provider::AzureOpenAi,
      Provider::Packmind,
    ]
    {   assert_eq!(assert_ok!(provider.as_str().parse::<Provider>()), provider);
        assert_eq!(
          serde_json::to_value(provider).unwrap(),
          json!(provider.as_str())
        );
    }
}

#[test]
fn test_gateway_config_defaults()
{   let config = assert_ok!(GatewayConfig::from_json_str(r#"{
      "provider": { "provider": "gemini", "apiKey": "g", "model": "gemini-2.5-pro" }
    }"#));
    assert_eq!(config.execution, ExecutionConfig::default());
    assert_eq!(config.execution.default_retry_attempts, 5);
    assert_eq!(config.execution.request_timeout_secs, 60);
    assert_eq!(config.provider, ProviderConfig::Gemini(GeminiConfig
    {   api_key: "g".to_string()
      , model: Some("gemini-2.5-pro".to_string())
      , ..Default::default()
    }));

    let config = assert_ok!(GatewayConfig::from_json_str(r#"{
      "provider": { "provider": "packmind" },
      "execution": { "defaultRetryAttempts": 2 }
    }"#));
    assert_eq!(config.execution.default_retry_attempts, 2);
    assert_eq!(config.execution.request_timeout_secs, 60);

    assert_err!(GatewayConfig::from_json_str(r#"{ "provider": { "provider": "nope" } }"#));
}

#[test]
fn test_gateway_config_file()
{   let path = std::env::temp_dir().join(format!("allm-gateway-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "provider": { "provider": "anthropic", "apiKey": "k" } }"#)
      .unwrap();

    let config = assert_ok!(GatewayConfig::from_json_file(&path));
    assert_eq!(config.provider.provider(), Provider::Anthropic);
    std::fs::remove_file(&path).unwrap();

    assert_err!(GatewayConfig::from_json_file(&path));
}

#[tokio::test]
async fn test_config_sources()
{   let source: StaticConfigSource = [("A", "1"), ("EMPTY", "")].into_iter().collect();
    assert_eq!(assert_ok!(source.get_config("A").await), Some("1".to_string()));
    assert_eq!(assert_ok!(source.get_config("EMPTY").await), None);
    assert_eq!(assert_ok!(source.get_config("MISSING").await), None);

    assert_eq!(
      assert_ok!(EnvConfigSource.get_config("ALLM_GATEWAY_SURELY_UNSET_KEY").await),
      None
    );
}

#[tokio::test]
async fn test_factory_builds_matching_service()
{   let source = Arc::new(StaticConfigSource::new());
    let cases = [
      json!({ "provider": "openai", "apiKey": "k" }),
      json!({ "provider": "anthropic", "apiKey": "k" }),
      json!({ "provider": "gemini", "apiKey": "k" }),
      json!({ "provider": "openai-compatible", "llmEndpoint": "http://x", "llmApiKey": "k", "model": "m" }),
      json!({ "provider": "azure-openai", "endpoint": "http://x", "apiKey": "k", "model": "d" }),
      json!({ "provider": "packmind" }),
    ];

    for value in cases
    {   let expected = value["provider"].as_str().unwrap().to_string();
        let service = assert_ok!(create_llm_service_from_json(
          value,
          source.clone(),
          ExecutionConfig::default()
        ));
        assert_eq!(service.provider().as_str(), expected);
    }

    let error = create_llm_service_from_json(
      json!({ "provider": "bogus" }),
      source.clone(),
      ExecutionConfig::default()
    ).err().expect("bogus tag rejected");
    assert_eq!(error, Error::UnknownProvider("bogus".to_string()));

    let service = create_llm_service(
      ProviderConfig::Gemini(GeminiConfig::default()),
      source,
      ExecutionConfig::default()
    );
    assert!(!service.is_configured().await);
}
