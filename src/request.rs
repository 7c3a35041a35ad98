//! Unified request and response types for allm-proxy

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::RequestDefaults;
use crate::error::Error;
use crate::Provider;

/// Chat role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
  , Assistant
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: Role
  , pub content: String
}

impl ChatMessage
{   pub fn system(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::Assistant, content: content.into() }
    }
}

/// Body as the caller sends it; every field optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundRequest
{   #[serde(default)]
    pub provider: Option<String>
  , #[serde(default)]
    pub model: Option<String>
  , #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>
  , #[serde(default)]
    pub prompt: Option<String>
  , /// System message paired with `prompt`
    #[serde(default)]
    pub system: Option<String>
  , #[serde(default)]
    pub temperature: Option<f32>
  , #[serde(default)]
    pub max_tokens: Option<u32>
  , #[serde(default)]
    pub response_format: Option<Value>
}

impl InboundRequest
{   /// Fill defaults and check that there is something to send
    pub fn normalize(
      self
    , defaults: &RequestDefaults
    ) -> Result<CanonicalRequest, Error>
    {   let provider = match self.provider.as_deref()
        {   None => None
          , Some(name) if name.trim().is_empty() => None
          , Some(name) => Some(
              Provider::from_request_name(name)
                .ok_or_else(|| Error::InvalidRequestBody(
                  format!("unknown provider '{}'", name)
                ))?
            )
        };

        let messages = match (self.messages, self.prompt)
        {   (Some(messages), _) if !messages.is_empty() => messages
          , (_, Some(prompt)) if !prompt.trim().is_empty() => {
              let mut wrapped = Vec::with_capacity(2);
              if let Some(system) = self.system
                .filter(|s| !s.trim().is_empty())
              {   wrapped.push(ChatMessage::system(system));
              }
              wrapped.push(ChatMessage::user(prompt));
              wrapped
            }
          , _ => {
              return Err(Error::InvalidRequestBody(
                "request must carry non-empty `messages` or `prompt`"
                  .to_string()
              ));
            }
        };

        let temperature = self.temperature
          .unwrap_or(defaults.temperature);
        if !temperature.is_finite() || temperature < 0.0
        {   return Err(Error::InvalidRequestBody(
              format!("temperature out of range: {}", temperature)
            ));
        }

        let model = self.model
          .filter(|m| !m.trim().is_empty())
          .unwrap_or_else(|| defaults.model.clone());

        Ok(CanonicalRequest
        {   provider
          , model
          , messages
          , temperature
          , max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens)
          , response_format: self.response_format
        })
    }
}

/// The proxy's provider-independent request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRequest
{   /// Provider to try first
    pub provider: Option<Provider>
  , pub model: String
  , /// Never empty
    pub messages: Vec<ChatMessage>
  , pub temperature: f32
  , pub max_tokens: u32
  , /// Passed through untouched
    pub response_format: Option<Value>
}

impl CanonicalRequest
{   /// Parse a raw POST body
    pub fn parse(
      body: &[u8]
    , defaults: &RequestDefaults
    ) -> Result<Self, Error>
    {   if body.iter().all(u8::is_ascii_whitespace)
        {   return Err(Error::InvalidRequestBody(
              "empty body".to_string()
            ));
        }
        let inbound: InboundRequest = serde_json::from_slice(body)
          .map_err(|e| Error::InvalidRequestBody(
            format!("invalid JSON: {}", e)
          ))?;
        inbound.normalize(defaults)
    }

    /// Build directly from messages with default settings
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self
    {   let defaults = RequestDefaults::default();
        CanonicalRequest
        {   provider: None
          , model: defaults.model
          , messages
          , temperature: defaults.temperature
          , max_tokens: defaults.max_tokens
          , response_format: None
        }
    }

    /// Every message content in order, each followed by a newline
    pub fn joined_text(&self) -> String
    {   let mut joined = String::new();
        for message in &self.messages
        {   joined.push_str(&message.content);
            joined.push('\n');
        }
        joined
    }
}

/// A complete answer from exactly one provider or the local generator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResult
{   pub provider: Provider
  , pub text: String
  , /// Upstream payload as received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>
}

/// Reply envelope of the proxy endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyEnvelope
{   pub ok: bool
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>
}

impl ProxyEnvelope
{   pub fn answered(result: &ProviderResult) -> Self
    {   ProxyEnvelope
        {   ok: true
          , text: Some(result.text.clone())
          , provider: Some(result.provider)
          , error: None
          , details: None
        }
    }

    pub fn failed(error: &Error) -> Self
    {   ProxyEnvelope
        {   ok: false
          , text: None
          , provider: None
          , error: Some(error.to_string())
          , details: error.details().map(str::to_string)
        }
    }

    pub fn with_details(mut self, details: Option<String>) -> Self
    {   self.details = details;
        self
    }
}

/// Token counts in the OpenAI shape.
///
/// These are estimates (one token per four characters, rounded up),
/// not the output of a real tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage
{   pub prompt_tokens: usize
  , pub completion_tokens: usize
  , pub total_tokens: usize
}

impl Usage
{   pub fn estimate(prompt: &str, completion: &str) -> Self
    {   let prompt_chars = prompt.chars().count();
        let completion_chars = completion.chars().count();
        Usage
        {   prompt_tokens: prompt_chars.div_ceil(4)
          , completion_tokens: completion_chars.div_ceil(4)
          , total_tokens: (prompt_chars + completion_chars).div_ceil(4)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice
{   pub index: usize
  , pub message: ChatMessage
  , pub finish_reason: String
}

/// OpenAI-compatible completion returned by the direct endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion
{   pub object: String
  , pub model: String
  , pub provider: Provider
  , pub choices: Vec<CompletionChoice>
  , pub usage: Usage
}

impl ChatCompletion
{   pub fn from_result(
      result: &ProviderResult
    , request: &CanonicalRequest
    ) -> Self
    {   ChatCompletion
        {   object: "chat.completion".to_string()
          , model: request.model.clone()
          , provider: result.provider
          , choices: vec![
              CompletionChoice
              {   index: 0
                , message: ChatMessage::assistant(result.text.clone())
                , finish_reason: "stop".to_string()
              }
            ]
          , usage: Usage::estimate(
              &request.joined_text(),
              &result.text
            )
        }
    }
}
