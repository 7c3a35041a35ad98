//! Failover logic: explicit provider, OpenAI, Gemini, local generator

use std::sync::Arc;
use log::{debug, info, warn};

use crate::error::Error;
use crate::providers::UpstreamProvider;
use crate::quiz::{self, vocabulary::TopicVocabulary};
use crate::request::{CanonicalRequest, ProviderResult};
use crate::Provider;

/// Upstream order when the caller names no provider
pub const DEFAULT_ORDER: [Provider; 2] = [Provider::OpenAI, Provider::Gemini];

/// Failover provider sequence for one request
#[derive(Debug, Clone, PartialEq)]
pub struct FailoverSequence
{   pub providers: Vec<Provider>
  , pub current_index: usize
}

impl FailoverSequence
{   /// Explicit provider first, then the default order; no provider
    /// appears twice
    pub fn for_request(explicit: Option<Provider>) -> Self
    {   let mut providers = Vec::with_capacity(DEFAULT_ORDER.len());
        if let Some(provider) = explicit.filter(Provider::is_upstream)
        {   providers.push(provider);
        }
        for provider in DEFAULT_ORDER
        {   if !providers.contains(&provider)
            {   providers.push(provider);
            }
        }
        debug!(
          "Failover sequence with {} providers: {:?}",
          providers.len(), providers
        );
        FailoverSequence
        {   providers
          , current_index: 0
        }
    }

    /// Check if we have more providers to try
    pub fn has_next(&self) -> bool
    {   self.current_index < self.providers.len()
    }
}

impl Iterator for FailoverSequence
{   type Item = Provider;

    fn next(&mut self) -> Option<Provider>
    {   let provider = self.providers.get(self.current_index).copied();
        if provider.is_some()
        {   self.current_index += 1;
        }
        provider
    }
}

/// Why a provider did not answer
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptFailure
{   pub provider: Provider
  , pub error: Error
}

/// Final result of a chain run plus every step that failed before it
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome
{   pub result: ProviderResult
  , pub failures: Vec<AttemptFailure>
}

impl ChainOutcome
{   pub fn answered_by(&self) -> Provider
    {   self.result.provider
    }

    /// Short per-provider summary, without upstream bodies
    pub fn failure_summary(&self) -> Option<String>
    {   if self.failures.is_empty()
        {   return None;
        }
        let parts: Vec<String> = self.failures
          .iter()
          .map(|f| format!("{}: {}", f.provider, f.error))
          .collect();
        Some(parts.join("; "))
    }
}

/// The fallback chain. Holds read-only state only and is shared
/// between requests.
pub struct FallbackChain
{   upstreams: Vec<Arc<dyn UpstreamProvider>>
  , vocabulary: Arc<TopicVocabulary>
}

impl FallbackChain
{   pub fn new(
      upstreams: Vec<Arc<dyn UpstreamProvider>>
    , vocabulary: Arc<TopicVocabulary>
    ) -> Self
    {   debug!("Creating fallback chain over {} upstreams", upstreams.len());
        FallbackChain
        {   upstreams
          , vocabulary
        }
    }

    pub fn upstream(&self, provider: Provider)
      -> Option<&Arc<dyn UpstreamProvider>>
    {   self.upstreams.iter().find(|u| u.provider() == provider)
    }

    /// True if the provider exists and has a credential
    pub fn is_available(&self, provider: Provider) -> bool
    {   self.upstream(provider)
          .map(|u| u.has_credential())
          .unwrap_or(false)
    }

    pub fn vocabulary(&self) -> &TopicVocabulary
    {   &self.vocabulary
    }

    /// Run the chain. Always returns a result: the local generator
    /// answers when every upstream is skipped or fails.
    pub async fn run(&self, request: &CanonicalRequest) -> ChainOutcome
    {   let mut failures = Vec::new();

        for provider in FailoverSequence::for_request(request.provider)
        {   let upstream = match self.upstream(provider)
            {   Some(upstream) => upstream
              , None => {
                  debug!("No client registered for {}", provider);
                  continue;
                }
            };

            if !upstream.has_credential()
            {   debug!("Skipping {}: no credential", provider);
                failures.push(AttemptFailure
                {   provider
                  , error: Error::MissingCredential(provider)
                });
                continue;
            }

            match upstream.complete(request).await
            {   Ok(result) => {
                  info!("Request answered by {}", provider);
                  return ChainOutcome { result, failures };
                }
              , Err(error) => {
                  warn!("{} attempt failed: {}", provider, error);
                  failures.push(AttemptFailure { provider, error });
                }
            }
        }

        info!("All providers unavailable, answering locally");
        ChainOutcome
        {   result: quiz::local_answer(request, &self.vocabulary)
          , failures
        }
    }
}
