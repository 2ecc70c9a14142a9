//! Model tier resolution

use crate::request::{Performance, PromptOptions};

/// Standard and fast model identifiers for one adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPair
{   pub standard: String
  , pub fast: String
}

impl ModelPair
{   pub fn new(
      standard: impl Into<String>
    , fast: impl Into<String>
    ) -> Self
    {   ModelPair
        {   standard: standard.into()
          , fast: fast.into()
        }
    }

    /// Merge configured names over vendor defaults.
    ///
    /// Empty strings count as "not configured".
    pub fn resolve(
      configured_standard: Option<&str>
    , configured_fast: Option<&str>
    , default_standard: &str
    , default_fast: &str
    ) -> Self
    {   ModelPair::new(
          non_empty(configured_standard).unwrap_or(default_standard)
        , non_empty(configured_fast).unwrap_or(default_fast)
        )
    }

    /// For deployment-style providers without vendor defaults: the fast
    /// model falls back to the standard one.
    pub fn with_fallback(
      standard: Option<&str>
    , fast: Option<&str>
    ) -> Self
    {   let standard = non_empty(standard).unwrap_or_default();
        ModelPair::new(standard, non_empty(fast).unwrap_or(standard))
    }

    pub fn select(&self, options: &PromptOptions) -> &str
    {   select_model(options, &self.standard, &self.fast)
    }
}

/// FAST picks the fast model; STANDARD or no hint picks the standard one.
pub fn select_model<'a>(
  options: &PromptOptions
, standard_model: &'a str
, fast_model: &'a str
) -> &'a str
{   match options.performance
    {   Some(Performance::Fast) => fast_model
      , Some(Performance::Standard) | None => standard_model
    }
}

fn non_empty(value: Option<&str>) -> Option<&str>
{   value.filter(|v| !v.trim().is_empty())
}
