//! HTTP plumbing shared by the vendor adapters

use std::time::Duration;

use log::{error, trace};
use serde::de::DeserializeOwned;

use crate::error::Error;

/// Connected HTTP handle for one vendor
#[derive(Debug, Clone)]
pub struct HttpClient
{   pub http: reqwest::Client
  , pub base_url: String
  , pub api_key: String
}

impl HttpClient
{   pub fn new(
      base_url: &str
    , api_key: &str
    , timeout: Duration
    ) -> Result<Self, Error>
    {   let http = reqwest::Client::builder()
          .timeout(timeout)
          .build()
          .map_err(|e| Error::Other(e.to_string()))?;
        Ok(HttpClient
        {   http
          , base_url: base_url.trim_end_matches('/').to_string()
          , api_key: api_key.to_string()
        })
    }

    pub fn url(&self, path: &str) -> String
    {   format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Send a request and decode a JSON body.
///
/// Non-success statuses become `Error::Http` carrying the response body;
/// transport failures become `Error::Network`.
pub async fn send_json<R: DeserializeOwned>(
  builder: reqwest::RequestBuilder
, service_name: &str
) -> Result<R, Error>
{   let response = builder
      .send()
      .await
      .map_err(|e| {
        error!("{} HTTP error: {}", service_name, e);
        transport_error(e)
      })?;

    let status = response.status();
    trace!("{} response status: {}", service_name, status);

    if !status.is_success()
    {   let body = response.text().await
          .unwrap_or_else(|_| "Unknown error".to_string());
        error!("{} API error {}: {}", service_name, status, body);
        return Err(Error::Http
        {   status: status.as_u16()
          , message: error_message(&body)
        });
    }

    response.json::<R>().await.map_err(|e| {
      error!("{} parse error: {}", service_name, e);
      Error::Parse(e.to_string())
    })
}

fn transport_error(e: reqwest::Error) -> Error
{   if e.is_timeout()
    {   Error::Network(format!("request timeout: {}", e))
    } else if e.is_decode()
    {   Error::Parse(e.to_string())
    } else
    {   Error::Network(e.to_string())
    }
}

/// Prefer the vendor's `error.message` over the raw body.
fn error_message(body: &str) -> String
{   serde_json::from_str::<serde_json::Value>(body)
      .ok()
      .and_then(|v| {
        v.pointer("/error/message")
          .and_then(|m| m.as_str())
          .map(str::to_string)
      })
      .unwrap_or_else(|| body.to_string())
}
