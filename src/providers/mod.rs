//! LLM provider implementations

pub mod openai;
pub mod gemini;

use async_trait::async_trait;

use crate::error::Error;
use crate::request::{CanonicalRequest, ProviderResult};
use crate::Provider;

// Re-export for convenience
pub use openai::OpenAiClient;
pub use gemini::GeminiClient;

/// One upstream the fallback chain can call
#[async_trait]
pub trait UpstreamProvider: Send + Sync
{   fn provider(&self) -> Provider;

    /// False means the chain skips this provider without a call
    fn has_credential(&self) -> bool;

    /// One attempt, no retries
    async fn complete(
      &self
    , request: &CanonicalRequest
    ) -> Result<ProviderResult, Error>;
}

/// Provider-specific request body
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload
{   OpenAI(openai::OpenAiChatRequest)
  , Gemini(gemini::GeminiPayload)
}

/// Translate a canonical request for `provider`; `None` for the
/// local generator, which takes the canonical request as is.
pub fn to_provider_payload(
  provider: Provider
, request: &CanonicalRequest
) -> Option<ProviderPayload>
{   match provider
    {   Provider::OpenAI => {
          Some(ProviderPayload::OpenAI(openai::to_payload(request)))
        }
      , Provider::Gemini => {
          Some(ProviderPayload::Gemini(gemini::to_payload(request)))
        }
      , Provider::Local => None
    }
}

/// Translate an upstream reply into a `ProviderResult`
pub fn from_provider_response(
  provider: Provider
, status: u16
, body: &str
) -> Result<ProviderResult, Error>
{   match provider
    {   Provider::OpenAI => openai::from_response(status, body)
      , Provider::Gemini => gemini::from_response(status, body)
      , Provider::Local => Err(Error::InvalidConfiguration(
          "the local generator has no upstream response".to_string()
        ))
    }
}
