use serde::{Deserialize, Serialize};
use serde_json::Value;
use log::{debug, trace, error};
use async_trait::async_trait;

use crate::config::{ProviderConfig, DEFAULT_OPENAI_MODEL};
use crate::error::{excerpt, Error};
use crate::request::{CanonicalRequest, ChatMessage, ProviderResult};
use crate::Provider;

// ===== Message Types =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub temperature: f32
  , pub max_tokens: u32
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChatResponse
{   #[serde(default)]
    pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   #[serde(default)]
    pub message: Option<ResponseMessage>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage
{   #[serde(default)]
    pub content: Option<String>
}

// ===== Translation =====

/// Chat-completions payload; Gemini model names are replaced by
/// the OpenAI default.
pub fn to_payload(request: &CanonicalRequest) -> OpenAiChatRequest
{   let model = if request.model.to_ascii_lowercase().starts_with("gemini")
    {   DEFAULT_OPENAI_MODEL.to_string()
    } else
    {   request.model.clone()
    };
    OpenAiChatRequest
    {   model
      , messages: request.messages.clone()
      , temperature: request.temperature
      , max_tokens: request.max_tokens
      , response_format: request.response_format.clone()
    }
}

/// `choices[0].message.content` out of a chat-completions reply
pub fn from_response(status: u16, body: &str)
  -> Result<ProviderResult, Error>
{   if !(200..300).contains(&status)
    {   return Err(Error::UpstreamHttpError
        {   provider: Provider::OpenAI
          , status
          , body_excerpt: excerpt(body)
        });
    }

    let raw: Value = serde_json::from_str(body)
      .map_err(|e| malformed(format!("invalid JSON: {}", e)))?;
    let parsed: OpenAiChatResponse = serde_json::from_value(raw.clone())
      .map_err(|e| malformed(format!("unexpected shape: {}", e)))?;

    let text = parsed.choices
      .into_iter()
      .next()
      .and_then(|c| c.message)
      .and_then(|m| m.content)
      .ok_or_else(|| malformed(
        "missing choices[0].message.content".to_string()
      ))?;

    Ok(ProviderResult
    {   provider: Provider::OpenAI
      , text
      , raw: Some(raw)
    })
}

fn malformed(detail: String) -> Error
{   Error::MalformedUpstreamResponse
    {   provider: Provider::OpenAI
      , detail
    }
}

// ===== OpenAI Client =====

/// OpenAI chat-completions client
pub struct OpenAiClient
{   api_key: Option<String>
  , api_base: String
  , http_client: reqwest::Client
}

impl OpenAiClient
{   pub fn new(
      config: &ProviderConfig
    , http_client: reqwest::Client
    ) -> Self
    {   debug!("Creating OpenAiClient for {}", config.api_base);
        OpenAiClient
        {   api_key: config.credential().map(str::to_string)
          , api_base: config.api_base.trim_end_matches('/').to_string()
          , http_client
        }
    }

    fn get_api_key(&self) -> Result<&str, Error>
    {   self.api_key
          .as_deref()
          .ok_or(Error::MissingCredential(Provider::OpenAI))
    }
}

#[async_trait]
impl super::UpstreamProvider for OpenAiClient
{   fn provider(&self) -> Provider
    {   Provider::OpenAI
    }

    fn has_credential(&self) -> bool
    {   self.api_key.is_some()
    }

    async fn complete(
      &self
    , request: &CanonicalRequest
    ) -> Result<ProviderResult, Error>
    {   let api_key = self.get_api_key()?;
        let payload = to_payload(request);
        debug!("Sending to OpenAI model: {}", payload.model);
        trace!("OpenAI request: {:?}", payload);

        let response = self.http_client
          .post(format!("{}/v1/chat/completions", self.api_base))
          .header("Authorization", format!("Bearer {}", api_key))
          .header("Content-Type", "application/json")
          .json(&payload)
          .send()
          .await
          .map_err(|e| {
            error!("OpenAI HTTP error: {}", e);
            Error::from_reqwest(e)
          })?;

        let status = response.status().as_u16();
        trace!("OpenAI response status: {}", status);

        let body = response.text().await
          .map_err(|e| {
            error!("OpenAI body read error: {}", e);
            Error::from_reqwest(e)
          })?;

        from_response(status, &body).map_err(|e| {
          error!("OpenAI API error: HTTP {} - {}", status, excerpt(&body));
          e
        })
    }
}
