use std::fmt;

use crate::Provider;

/// Longest upstream body excerpt kept in an error
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Custom error type for proxy operations
/// Implements Clone so failures can be kept in the chain outcome
#[derive(Debug, Clone, PartialEq)]
pub enum Error
{   /// No credential configured for a provider
    MissingCredential(Provider)
  , /// Provider answered with a non-2xx status
    UpstreamHttpError
    {   provider: Provider
      , status: u16
      , body_excerpt: String
    }
  , /// Provider body was not JSON or lacked the content path
    MalformedUpstreamResponse
    {   provider: Provider
      , detail: String
    }
  , /// Transport-level failure talking to a provider
    HttpError(String)
  , /// Upstream call exceeded the configured timeout
    Timeout
  , /// Caller sent a body we cannot use
    InvalidRequestBody(String)
  , /// Caller used an HTTP verb the route does not accept
    MethodNotAllowed(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
}

impl Error
{   /// HTTP status the server answers with for this error
    pub fn status_code(&self) -> u16
    {   match self
        {   Error::MissingCredential(_) => 503
          , Error::UpstreamHttpError { status, .. } => {
              if (400..600).contains(status) { *status } else { 502 }
            }
          , Error::MalformedUpstreamResponse { .. } => 502
          , Error::HttpError(_) => 502
          , Error::Timeout => 504
          , Error::InvalidRequestBody(_) => 400
          , Error::MethodNotAllowed(_) => 405
          , Error::InvalidConfiguration(_) => 500
        }
    }

    /// True for errors caused by the caller's input
    pub fn is_caller_error(&self) -> bool
    {   matches!(
          self,
          Error::InvalidRequestBody(_) | Error::MethodNotAllowed(_)
        )
    }

    /// Upstream body excerpt, if this error carries one
    pub fn details(&self) -> Option<&str>
    {   match self
        {   Error::UpstreamHttpError { body_excerpt, .. }
              if !body_excerpt.is_empty() => Some(body_excerpt)
          , _ => None
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self
    {   if err.is_timeout()
        {   Error::Timeout
        } else
        {   Error::HttpError(err.to_string())
        }
    }
}

/// Cut an upstream body down to something safe to log and return
pub fn excerpt(body: &str) -> String
{   let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS
    {   return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars()
      .take(BODY_EXCERPT_CHARS)
      .collect();
    cut.push_str("...");
    cut
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingCredential(provider) => {
              write!(f, "Missing credential for: {}", provider)
            }
          , Error::UpstreamHttpError { provider, status, .. } => {
              write!(f, "{} returned HTTP {}", provider, status)
            }
          , Error::MalformedUpstreamResponse { provider, detail } => {
              write!(f,
                "Malformed response from {}: {}",
                provider, detail
              )
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::InvalidRequestBody(msg) => {
              write!(f, "Invalid request body: {}", msg)
            }
          , Error::MethodNotAllowed(method) => {
              write!(f, "Method not allowed: {}", method)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}
