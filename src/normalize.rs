//! Response normalization: content validation, thinking-tag removal and
//! JSON coercion

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, ErrorKind};
use crate::request::PromptData;

static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?s)<think>.*?</think>").expect("static regex")
});

/// Fail with `InvalidResponse` when the vendor returned no usable text.
pub fn require_content(
  content: Option<String>
, service_name: &str
) -> Result<String, Error>
{   match content
    {   Some(text) if !text.is_empty() => Ok(text)
      , _ => {
          debug!("{} returned no content", service_name);
          Err(Error::classified(
            ErrorKind::InvalidResponse,
            format!(
              "Invalid response from {}: no content returned",
              service_name
            )
          ))
        }
    }
}

/// Remove every `<think>...</think>` block and trim the ends.
///
/// Text between blocks keeps its original spacing.
pub fn strip_thinking(content: &str) -> String
{   let stripped = THINK_BLOCK.replace_all(content, "");
    trace!(
      "strip_thinking {} -> {} bytes",
      content.len(), stripped.len()
    );
    stripped.trim().to_string()
}

/// Parse object-looking content as JSON, otherwise keep the raw string.
///
/// Only a leading `{` (after trimming) triggers a parse; a failed parse
/// also keeps the raw string.
pub fn coerce(content: &str) -> PromptData
{   if content.trim_start().starts_with('{')
    {   match serde_json::from_str::<serde_json::Value>(content)
        {   Ok(value) => return PromptData::Json(value)
          , Err(e) => {
              debug!("Content looked like JSON but did not parse: {}", e);
            }
        }
    }
    PromptData::Text(content.to_string())
}

/// Full post-processing of raw vendor text.
pub fn normalize(
  content: Option<String>
, service_name: &str
, strip_thinking_tags: bool
) -> Result<PromptData, Error>
{   let content = require_content(content, service_name)?;
    if strip_thinking_tags
    {   // reasoning-only replies have nothing left to return
        let stripped = require_content(Some(strip_thinking(&content)), service_name)?;
        Ok(coerce(&stripped))
    } else
    {   Ok(coerce(&content))
    }
}
