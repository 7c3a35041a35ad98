use std::sync::Arc;
use std::time::Duration;
use log::{debug, info};

use crate::config::ProxyConfig;
use crate::error::Error;
use crate::failover::{ChainOutcome, FallbackChain};
use crate::providers::{GeminiClient, OpenAiClient, UpstreamProvider};
use crate::request::{CanonicalRequest, ProviderResult};
use crate::Provider;

/// Backend behind every route. Built once at start, shared through
/// an `Arc`, never mutated afterwards.
pub struct ProxyBackend
{   config: ProxyConfig
  , chain: FallbackChain
}

impl ProxyBackend
{   /// Build the HTTP client and both provider clients from config
    pub fn new(config: ProxyConfig) -> Result<Self, Error>
    {   debug!("Initializing ProxyBackend");
        config.validate()?;

        let http_client = reqwest::Client::builder()
          .timeout(Duration::from_secs(config.timeout_secs))
          .user_agent(concat!("allm-proxy/", env!("CARGO_PKG_VERSION")))
          .build()
          .map_err(|e| Error::InvalidConfiguration(
            format!("cannot build HTTP client: {}", e)
          ))?;

        let openai: Arc<dyn UpstreamProvider>
          = Arc::new(OpenAiClient::new(&config.openai, http_client.clone()));
        let gemini: Arc<dyn UpstreamProvider>
          = Arc::new(GeminiClient::new(&config.gemini, http_client));
        let upstreams = vec![openai, gemini];
        Ok(ProxyBackend::with_upstreams(config, upstreams))
    }

    /// Backend over caller-supplied upstreams
    pub fn with_upstreams(
      config: ProxyConfig
    , upstreams: Vec<Arc<dyn UpstreamProvider>>
    ) -> Self
    {   let chain = FallbackChain::new(
          upstreams,
          Arc::new(config.vocabulary.clone())
        );
        info!(
          "Backend ready: openai={}, gemini={}",
          chain.is_available(Provider::OpenAI),
          chain.is_available(Provider::Gemini)
        );
        ProxyBackend
        {   config
          , chain
        }
    }

    pub fn config(&self) -> &ProxyConfig
    {   &self.config
    }

    pub fn chain(&self) -> &FallbackChain
    {   &self.chain
    }

    /// Parse and normalize a raw body with the configured defaults
    pub fn parse_request(&self, body: &[u8])
      -> Result<CanonicalRequest, Error>
    {   CanonicalRequest::parse(body, &self.config.defaults)
    }

    /// Full fallback chain; always answers
    pub async fn complete(&self, request: &CanonicalRequest)
      -> ChainOutcome
    {   debug!(
          "complete: model={}, explicit={:?}, {} messages",
          request.model, request.provider, request.messages.len()
        );
        self.chain.run(request).await
    }

    /// Exactly one provider, no fallback
    pub async fn complete_with(
      &self
    , provider: Provider
    , request: &CanonicalRequest
    ) -> Result<ProviderResult, Error>
    {   debug!("complete_with: {}", provider);
        let upstream = self.chain
          .upstream(provider)
          .filter(|u| u.has_credential())
          .ok_or(Error::MissingCredential(provider))?;
        upstream.complete(request).await
    }
}
