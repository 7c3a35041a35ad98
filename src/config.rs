//! Configuration for upstream providers, request defaults and the server

use serde::{Deserialize, Serialize};
use log::{debug, info};

use crate::error::Error;
use crate::quiz::vocabulary::TopicVocabulary;

pub const OPENAI_API_BASE: &str
  = "https://api.openai.com";
pub const GEMINI_API_BASE: &str
  = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Upstream provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig
{   /// Credential; `None` means the provider is unavailable
    pub api_key: Option<String>
  , /// API base URL without the version path
    pub api_base: String
}

impl ProviderConfig
{   pub fn openai() -> Self
    {   ProviderConfig
        {   api_key: None
          , api_base: OPENAI_API_BASE.to_string()
        }
    }

    pub fn gemini() -> Self
    {   ProviderConfig
        {   api_key: None
          , api_base: GEMINI_API_BASE.to_string()
        }
    }

    /// Credential, with blank strings treated as absent
    pub fn credential(&self) -> Option<&str>
    {   self.api_key
          .as_deref()
          .map(str::trim)
          .filter(|k| !k.is_empty())
    }

    fn or_defaults(mut self, defaults: ProviderConfig) -> Self
    {   if self.api_base.trim().is_empty()
        {   self.api_base = defaults.api_base;
        }
        self
    }
}

impl Default for ProviderConfig
{   /// Blank base; `ProxyConfig::from_file` fills it in per provider
    fn default() -> Self
    {   ProviderConfig
        {   api_key: None
          , api_base: String::new()
        }
    }
}

/// Defaults applied while normalizing inbound requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults
{   pub model: String
  , pub temperature: f32
  , pub max_tokens: u32
}

impl Default for RequestDefaults
{   fn default() -> Self
    {   RequestDefaults
        {   model: DEFAULT_OPENAI_MODEL.to_string()
          , temperature: 0.6
          , max_tokens: 2000
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig
{   pub openai: ProviderConfig
  , pub gemini: ProviderConfig
  , /// Per upstream call, shared by every provider
    pub timeout_secs: u64
  , pub bind_addr: String
  , pub defaults: RequestDefaults
  , /// Topic table for the local generator
    pub vocabulary: TopicVocabulary
}

impl Default for ProxyConfig
{   fn default() -> Self
    {   ProxyConfig
        {   openai: ProviderConfig::openai()
          , gemini: ProviderConfig::gemini()
          , timeout_secs: DEFAULT_TIMEOUT_SECS
          , bind_addr: DEFAULT_BIND_ADDR.to_string()
          , defaults: RequestDefaults::default()
          , vocabulary: TopicVocabulary::default()
        }
    }
}

impl ProxyConfig
{   /// Load once at process start: optional JSON file named by
    /// `ALLM_PROXY_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self, Error>
    {   let base = match env_value("ALLM_PROXY_CONFIG")
        {   Some(path) => ProxyConfig::from_file(&path)?
          , None => ProxyConfig::default()
        };
        base.with_env_overrides(env_value)
    }

    pub fn from_file(path: &str) -> Result<Self, Error>
    {   debug!("Reading config file: {}", path);
        let text = std::fs::read_to_string(path)
          .map_err(|e| Error::InvalidConfiguration(
            format!("cannot read {}: {}", path, e)
          ))?;
        let mut config: ProxyConfig = serde_json::from_str(&text)
          .map_err(|e| Error::InvalidConfiguration(
            format!("cannot parse {}: {}", path, e)
          ))?;
        config.openai = config.openai.or_defaults(ProviderConfig::openai());
        config.gemini = config.gemini.or_defaults(ProviderConfig::gemini());
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn with_env_overrides<F>(mut self, lookup: F)
      -> Result<Self, Error>
    where
      F: Fn(&str) -> Option<String>
    {   if let Some(key) = lookup("OPENAI_API_KEY")
        {   self.openai.api_key = Some(key);
        }
        if let Some(key) = lookup("GEMINI_API_KEY")
        {   self.gemini.api_key = Some(key);
        }
        if let Some(base) = lookup("OPENAI_API_BASE")
        {   self.openai.api_base = base;
        }
        if let Some(base) = lookup("GEMINI_API_BASE")
        {   self.gemini.api_base = base;
        }
        if let Some(secs) = lookup("ALLM_PROXY_TIMEOUT_SECS")
        {   self.timeout_secs = secs.trim().parse()
              .map_err(|_| Error::InvalidConfiguration(
                format!("ALLM_PROXY_TIMEOUT_SECS is not a number: {}", secs)
              ))?;
        }
        if let Some(port) = lookup("PORT")
        {   let port: u16 = port.trim().parse()
              .map_err(|_| Error::InvalidConfiguration(
                format!("PORT is not a port number: {}", port)
              ))?;
            self.bind_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(addr) = lookup("ALLM_PROXY_ADDR")
        {   self.bind_addr = addr;
        }
        self.validate()?;
        info!(
          "Config loaded: openai={}, gemini={}, timeout={}s",
          if self.openai.credential().is_some() { "set" } else { "unset" },
          if self.gemini.credential().is_some() { "set" } else { "unset" },
          self.timeout_secs
        );
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), Error>
    {   if self.timeout_secs == 0
        {   return Err(Error::InvalidConfiguration(
              "timeout_secs must be positive".to_string()
            ));
        }
        if !self.defaults.temperature.is_finite()
          || self.defaults.temperature < 0.0
        {   return Err(Error::InvalidConfiguration(
              "defaults.temperature must be a non-negative number"
                .to_string()
            ));
        }
        Ok(())
    }
}

/// Environment variable, with empty values treated as unset
fn env_value(name: &str) -> Option<String>
{   std::env::var(name)
      .ok()
      .filter(|v| !v.trim().is_empty())
}
