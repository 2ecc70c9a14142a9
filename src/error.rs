//! Error type and error classification for gateway operations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of failure categories used by the retry engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind
{   RateLimit
  , AuthenticationError
  , NetworkError
  , InvalidResponse
  , ApiError
  , MaxRetriesExceeded
}

impl ErrorKind
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   ErrorKind::RateLimit => "RATE_LIMIT"
          , ErrorKind::AuthenticationError => "AUTHENTICATION_ERROR"
          , ErrorKind::NetworkError => "NETWORK_ERROR"
          , ErrorKind::InvalidResponse => "INVALID_RESPONSE"
          , ErrorKind::ApiError => "API_ERROR"
          , ErrorKind::MaxRetriesExceeded => "MAX_RETRIES_EXCEEDED"
        }
    }
}

impl fmt::Display for ErrorKind
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

/// Custom error type for gateway operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error
{   /// Error that already carries its classification
    #[error("{message}")]
    Service
    {   kind: ErrorKind
      , message: String
    }
  , /// Upstream answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http
    {   status: u16
      , message: String
    }
  , /// Transport failure before a response was received
    #[error("network error: {0}")]
    Network(String)
  , /// Failed to parse a payload
    #[error("Parse error: {0}")]
    Parse(String)
  , /// Provider tag not recognised
    #[error("Unknown provider: {0}")]
    UnknownProvider(String)
  , /// Capability the provider cannot offer
    #[error("{0}")]
    NotImplemented(String)
  , /// Required configuration value absent
    #[error("{0} not found in configuration")]
    MissingConfig(String)
  , /// Secret encryption or decryption failed
    #[error("Crypto error: {0}")]
    Crypto(String)
  , /// Backend task is gone
    #[error("Backend disconnected")]
    Disconnected
  , /// Generic error
    #[error("Error: {0}")]
    Other(String)
}

impl Error
{   /// Build an error with an explicit classification.
    pub fn classified(kind: ErrorKind, message: impl Into<String>) -> Self
    {   Error::Service { kind, message: message.into() }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16>
    {   match self
        {   Error::Http { status, .. } => Some(*status)
          , _ => None
        }
    }
}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::Parse(e.to_string())
    }
}

/// Map an error onto the retry taxonomy.
///
/// An explicit kind tag is returned unchanged. Otherwise an explicit 401/429
/// status decides, and finally the lower-cased message is matched in
/// priority order: authentication, rate limit, network. Never yields
/// `InvalidResponse` or `MaxRetriesExceeded` for untagged errors.
pub fn classify(error: &Error) -> ErrorKind
{   if let Error::Service { kind, .. } = error
    {   return *kind;
    }

    match error.status()
    {   Some(401) => return ErrorKind::AuthenticationError
      , Some(429) => return ErrorKind::RateLimit
      , _ => {}
    }

    classify_message(&error.to_string())
}

/// Text-only classification rule, for failures only available as strings.
pub fn classify_message(message: &str) -> ErrorKind
{   let lower = message.to_lowercase();

    // credential failures outrank everything else in the same message
    if lower.contains("unauthorized") || lower.contains("401")
    {   ErrorKind::AuthenticationError
    } else if lower.contains("rate limit") || lower.contains("429")
    {   ErrorKind::RateLimit
    } else if lower.contains("network") || lower.contains("timeout")
    {   ErrorKind::NetworkError
    } else
    {   ErrorKind::ApiError
    }
}
