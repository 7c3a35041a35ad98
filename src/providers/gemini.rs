use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use log::{debug, trace, error, warn};
use async_trait::async_trait;

use crate::config::{ProviderConfig, DEFAULT_GEMINI_MODEL};
use crate::error::{excerpt, Error};
use crate::request::{CanonicalRequest, ProviderResult};
use crate::Provider;

pub const GEMINI_PRO_MODEL: &str = "gemini-1.5-pro";
pub const TOP_K: u32 = 40;
pub const TOP_P: f32 = 0.95;

// The model id becomes a URL path segment next to the API key
static MODEL_ID: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^gemini[A-Za-z0-9._-]*$").expect("model id pattern")
});

// ===== Message Types =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiPart
{   pub text: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiContent
{   pub parts: Vec<GeminiPart>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   pub temperature: f32
  , pub max_output_tokens: u32
  , pub top_k: u32
  , pub top_p: f32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest
{   pub contents: Vec<GeminiContent>
  , pub generation_config: GenerationConfig
}

/// Body plus the model id that goes into the URL
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiPayload
{   pub model: String
  , pub body: GeminiRequest
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate
{   #[serde(default)]
    pub content: Option<CandidateContent>
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent
{   #[serde(default)]
    pub parts: Vec<CandidatePart>
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidatePart
{   #[serde(default)]
    pub text: Option<String>
}

// ===== Translation =====

/// Pick the Gemini model id for a canonical model name. Only plain
/// `gemini...` ids are sent verbatim; anything else gets the default.
pub fn select_model(model: &str) -> String
{   let lowered = model.to_ascii_lowercase();
    if lowered.contains("gemini-pro")
    {   GEMINI_PRO_MODEL.to_string()
    } else if MODEL_ID.is_match(model)
    {   model.to_string()
    } else
    {   if lowered.starts_with("gemini")
        {   warn!("Unusable Gemini model id {:?}, using {}", model, DEFAULT_GEMINI_MODEL);
        }
        DEFAULT_GEMINI_MODEL.to_string()
    }
}

/// generateContent payload. Gemini gets plain text here, so every
/// message is flattened into one part and roles are dropped.
pub fn to_payload(request: &CanonicalRequest) -> GeminiPayload
{   GeminiPayload
    {   model: select_model(&request.model)
      , body: GeminiRequest
        {   contents: vec![
              GeminiContent
              {   parts: vec![
                    GeminiPart { text: request.joined_text() }
                  ]
              }
            ]
          , generation_config: GenerationConfig
            {   temperature: request.temperature
              , max_output_tokens: request.max_tokens
              , top_k: TOP_K
              , top_p: TOP_P
            }
        }
    }
}

/// `candidates[0].content.parts[0].text` out of a generateContent reply
pub fn from_response(status: u16, body: &str)
  -> Result<ProviderResult, Error>
{   if !(200..300).contains(&status)
    {   return Err(Error::UpstreamHttpError
        {   provider: Provider::Gemini
          , status
          , body_excerpt: excerpt(body)
        });
    }

    let raw: Value = serde_json::from_str(body)
      .map_err(|e| malformed(format!("invalid JSON: {}", e)))?;
    let parsed: GeminiResponse = serde_json::from_value(raw.clone())
      .map_err(|e| malformed(format!("unexpected shape: {}", e)))?;

    let text = parsed.candidates
      .into_iter()
      .next()
      .and_then(|c| c.content)
      .and_then(|c| c.parts.into_iter().next())
      .and_then(|p| p.text)
      .ok_or_else(|| malformed(
        "missing candidates[0].content.parts[0].text".to_string()
      ))?;

    Ok(ProviderResult
    {   provider: Provider::Gemini
      , text
      , raw: Some(raw)
    })
}

fn malformed(detail: String) -> Error
{   Error::MalformedUpstreamResponse
    {   provider: Provider::Gemini
      , detail
    }
}

// ===== Gemini Client =====

/// Gemini generateContent client; the key travels as a query parameter
pub struct GeminiClient
{   api_key: Option<String>
  , api_base: String
  , http_client: reqwest::Client
}

impl GeminiClient
{   pub fn new(
      config: &ProviderConfig
    , http_client: reqwest::Client
    ) -> Self
    {   debug!("Creating GeminiClient for {}", config.api_base);
        GeminiClient
        {   api_key: config.credential().map(str::to_string)
          , api_base: config.api_base.trim_end_matches('/').to_string()
          , http_client
        }
    }

    fn get_api_key(&self) -> Result<&str, Error>
    {   self.api_key
          .as_deref()
          .ok_or(Error::MissingCredential(Provider::Gemini))
    }
}

#[async_trait]
impl super::UpstreamProvider for GeminiClient
{   fn provider(&self) -> Provider
    {   Provider::Gemini
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
        debug!("Sending to Gemini model: {}", payload.model);
        trace!("Gemini request: {:?}", payload.body);

        let response = self.http_client
          .post(format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, payload.model
          ))
          .query(&[("key", api_key)])
          .header("Content-Type", "application/json")
          .json(&payload.body)
          .send()
          .await
          .map_err(|e| {
            let e = e.without_url();
            error!("Gemini HTTP error: {}", e);
            Error::from_reqwest(e)
          })?;

        let status = response.status().as_u16();
        trace!("Gemini response status: {}", status);

        let body = response.text().await
          .map_err(|e| {
            let e = e.without_url();
            error!("Gemini body read error: {}", e);
            Error::from_reqwest(e)
          })?;

        from_response(status, &body).map_err(|e| {
          error!("Gemini API error: HTTP {} - {}", status, excerpt(&body));
          e
        })
    }
}
