//! Retry decisions for the prompt execution loop

use log::trace;
use crate::error::ErrorKind;

/// Attempt budget used when neither the engine configuration nor the
/// call options say otherwise.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;

/// Retry policy for failed vendor calls.
///
/// Retries are immediate; there is no backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy
{   pub max_attempts: u32
}

impl RetryPolicy
{   /// Create a new retry policy; the budget is never below one attempt
    pub fn new(max_attempts: u32) -> Self
    {   RetryPolicy
        {   max_attempts: max_attempts.max(1)
        }
    }

    /// Budget for one call: the option override wins over the default.
    pub fn for_call(
      retry_attempts: Option<u32>
    , default_attempts: u32
    ) -> Self
    {   Self::new(retry_attempts.unwrap_or(default_attempts))
    }

    /// Whether another attempt should follow `attempt` under this budget
    pub fn allows_retry(&self, kind: ErrorKind, attempt: u32) -> bool
    {   should_retry(kind, attempt, self.max_attempts)
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(DEFAULT_RETRY_ATTEMPTS)
    }
}

/// Decide whether to make another attempt after a failure of `kind` on
/// attempt number `attempt` (1-based) out of `max_attempts`.
pub fn should_retry(
  kind: ErrorKind
, attempt: u32
, max_attempts: u32
) -> bool
{   trace!(
      "should_retry kind={} attempt={}/{}",
      kind, attempt, max_attempts
    );

    if attempt >= max_attempts
    {   return false;
    }

    match kind
    {   ErrorKind::RateLimit
      | ErrorKind::NetworkError
      | ErrorKind::ApiError => true
      , ErrorKind::AuthenticationError
      | ErrorKind::InvalidResponse
      | ErrorKind::MaxRetriesExceeded => false
    }
}
