pub mod error;
pub mod config;
pub mod extract;
pub mod providers;
pub mod request;
pub mod quiz;
pub mod failover;
pub mod client;
pub mod server;

use serde::{Deserialize, Serialize};
use std::fmt;

/*

allm-proxy is the HTTP face of allm: one unified chat-completion
request syntax in front of the public LLM APIs, with automatic
fail-over to the next provider and, when every provider is down
or unconfigured, a local quiz generator so callers always get
an answer.

allm-proxy/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports and shared API types
│   ├── main.rs         # Binary: config, logging, serve
│   ├── error.rs        # Error taxonomy and HTTP mapping
│   ├── config.rs       # Credentials, upstream bases, defaults
│   ├── request.rs      # Canonical request and reply envelopes
│   ├── extract.rs      # Topic and count extraction
│   ├── providers/      # Provider payload translation + clients
│   │   ├── mod.rs
│   │   ├── openai.rs
│   │   └── gemini.rs
│   ├── failover.rs     # Fallback chain
│   ├── quiz/           # Local template generator
│   │   ├── mod.rs
│   │   └── vocabulary.rs
│   ├── client.rs       # ProxyBackend: wires config to the chain
│   └── server.rs       # axum routes, CORS, status payload
└── tests/

*/

pub use client::ProxyBackend;
pub use config::ProxyConfig;
pub use error::Error;
pub use failover::{ChainOutcome, FallbackChain};
pub use request::{CanonicalRequest, ChatMessage, ProviderResult, Role};

/// Everything that can answer a proxied request.
/// `Local` is the built-in quiz generator, reported as "fallback".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
pub enum Provider
{
  /// OpenAI chat-completions API (and compatibles)
  #[serde(rename = "openai")]
  OpenAI
  ,
  /// Google Gemini generateContent API
  #[serde(rename = "gemini")]
  Gemini
  ,
  /// Local template generator, never fails
  #[serde(rename = "fallback")]
  Local
}

impl Provider
{   /// Name used on the wire
    pub fn name(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "openai"
          , Provider::Gemini => "gemini"
          , Provider::Local => "fallback"
        }
    }

    /// Parse a caller-supplied provider name; only upstreams qualify
    pub fn from_request_name(name: &str) -> Option<Provider>
    {   match name.trim().to_ascii_lowercase().as_str()
        {   "openai" => Some(Provider::OpenAI)
          , "gemini" => Some(Provider::Gemini)
          , _ => None
        }
    }

    pub fn is_upstream(&self) -> bool
    {   !matches!(self, Provider::Local)
    }
}

impl fmt::Display for Provider
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.name())
    }
}
