//! HTTP surface: axum routes, CORS headers and the status payload.
//!
//! Routes:
//! - `POST /`, `POST /api/proxy`: full fallback chain, reply envelope
//! - `POST /api/openai`, `POST /api/gemini`: one provider, OpenAI-compatible reply
//! - `GET` on any of the above and `/api/ping`: status, no provider calls
//! - `GET`/`POST /api/echo`: method and body back, for client debugging
//! - `OPTIONS` anywhere: 204 preflight

use std::sync::Arc;

use axum::{
  body::Bytes,
  extract::State,
  http::{header, HeaderValue, Method, StatusCode, Uri},
  middleware,
  response::{IntoResponse, Response},
  routing::{get, MethodRouter},
  Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use log::{debug, info, warn};

use crate::client::ProxyBackend;
use crate::error::Error;
use crate::request::{ChatCompletion, ProxyEnvelope};
use crate::Provider;

pub type SharedBackend = Arc<ProxyBackend>;

pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

// ===== Status payload =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus
{   pub openai: bool
  , pub gemini: bool
  , /// The local generator is always there
    pub fallback: bool
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo
{   pub path: String
  , pub description: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus
{   pub ok: bool
  , pub service: String
  , pub version: String
  , pub usage: String
  , pub providers: ProviderStatus
  , pub endpoints: Vec<EndpointInfo>
  , pub timestamp: DateTime<Utc>
}

/// What `/api/echo` sends back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoReply
{   pub ok: bool
  , pub method: String
  , /// Parsed JSON; a string when the body is not JSON, null when empty
    pub body: Value
  , pub timestamp: DateTime<Utc>
}

impl ServiceStatus
{   pub fn of(backend: &ProxyBackend) -> Self
    {   let endpoint = |path: &str, description: &str| EndpointInfo
        {   path: path.to_string()
          , description: description.to_string()
        };
        ServiceStatus
        {   ok: true
          , service: "allm-proxy".to_string()
          , version: env!("CARGO_PKG_VERSION").to_string()
          , usage: "POST JSON { model, messages } or { prompt }".to_string()
          , providers: ProviderStatus
            {   openai: backend.chain().is_available(Provider::OpenAI)
              , gemini: backend.chain().is_available(Provider::Gemini)
              , fallback: true
            }
          , endpoints: vec![
              endpoint("/api/proxy", "Unified proxy with provider fallback")
            , endpoint("/api/openai", "OpenAI only, OpenAI-compatible reply")
            , endpoint("/api/gemini", "Gemini only, OpenAI-compatible reply")
            , endpoint("/api/ping", "Health check")
            , endpoint("/api/echo", "Echo method and body")
            ]
          , timestamp: Utc::now()
        }
    }
}

// ===== Router =====

pub fn router(backend: SharedBackend) -> Router
{   Router::new()
      .route("/", proxy_route())
      .route("/api/proxy", proxy_route())
      .route("/api/openai", direct_route(get(status).post(direct_openai)))
      .route("/api/gemini", direct_route(get(status).post(direct_gemini)))
      .route("/api/ping", direct_route(get(status)))
      .route("/api/echo", direct_route(get(echo).post(echo)))
      .fallback(not_found)
      .layer(middleware::map_response(with_cors_headers))
      .with_state(backend)
}

fn proxy_route() -> MethodRouter<SharedBackend>
{   direct_route(get(status).post(proxy))
}

fn direct_route(route: MethodRouter<SharedBackend>)
  -> MethodRouter<SharedBackend>
{   route
      .options(preflight)
      .fallback(method_not_allowed)
}

/// Bind and serve until the process stops
pub async fn serve(backend: SharedBackend) -> Result<(), Error>
{   let addr = backend.config().bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
      .await
      .map_err(|e| Error::InvalidConfiguration(
        format!("cannot bind {}: {}", addr, e)
      ))?;

    info!("allm-proxy listening on {}", addr);
    info!("  POST /api/proxy   - unified proxy with fallback");
    info!("  POST /api/openai  - OpenAI only");
    info!("  POST /api/gemini  - Gemini only");
    info!("  GET  /api/ping    - health check");
    info!("  POST /api/echo    - echo request");

    axum::serve(listener, router(backend))
      .await
      .map_err(|e| Error::HttpError(e.to_string()))
}

// ===== Handlers =====

async fn proxy(
  State(backend): State<SharedBackend>
, body: Bytes
) -> Response
{   let request = match backend.parse_request(&body)
    {   Ok(request) => request
      , Err(error) => {
          warn!("Rejected proxy request: {}", error);
          return reject(&error);
        }
    };

    let outcome = backend.complete(&request).await;
    let envelope = ProxyEnvelope::answered(&outcome.result)
      .with_details(outcome.failure_summary());
    (StatusCode::OK, Json(envelope)).into_response()
}

async fn direct_openai(
  State(backend): State<SharedBackend>
, body: Bytes
) -> Response
{   direct(Provider::OpenAI, &backend, &body).await
}

async fn direct_gemini(
  State(backend): State<SharedBackend>
, body: Bytes
) -> Response
{   direct(Provider::Gemini, &backend, &body).await
}

/// Single-provider call; errors are returned, not recovered
async fn direct(
  provider: Provider
, backend: &ProxyBackend
, body: &[u8]
) -> Response
{   let request = match backend.parse_request(body)
    {   Ok(request) => request
      , Err(error) => {
          warn!("Rejected {} request: {}", provider, error);
          return reject(&error);
        }
    };

    match backend.complete_with(provider, &request).await
    {   Ok(result) => {
          let completion = ChatCompletion::from_result(&result, &request);
          (StatusCode::OK, Json(completion)).into_response()
        }
      , Err(error) => {
          warn!("Direct {} call failed: {}", provider, error);
          reject(&error)
        }
    }
}

async fn status(State(backend): State<SharedBackend>) -> Json<ServiceStatus>
{   debug!("Status requested");
    Json(ServiceStatus::of(&backend))
}

async fn echo(method: Method, body: Bytes) -> Json<EchoReply>
{   let body = if body.iter().all(u8::is_ascii_whitespace)
    {   Value::Null
    } else
    {   serde_json::from_slice(&body)
          .unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body).into_owned())
          })
    };
    debug!("Echo {}", method);
    Json(EchoReply
    {   ok: true
      , method: method.to_string()
      , body
      , timestamp: Utc::now()
    })
}

async fn preflight() -> impl IntoResponse
{   (
      StatusCode::NO_CONTENT,
      [(header::ACCESS_CONTROL_MAX_AGE, "86400")],
    )
}

async fn method_not_allowed(method: Method) -> Response
{   reject(&Error::MethodNotAllowed(method.to_string()))
}

async fn not_found(method: Method, uri: Uri) -> Response
{   if method == Method::OPTIONS
    {   return preflight().await.into_response();
    }
    let envelope = ProxyEnvelope
    {   ok: false
      , text: None
      , provider: None
      , error: Some(format!("No route for {}", uri.path()))
      , details: None
    };
    (StatusCode::NOT_FOUND, Json(envelope)).into_response()
}

fn reject(error: &Error) -> Response
{   let status = StatusCode::from_u16(error.status_code())
      .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ProxyEnvelope::failed(error))).into_response()
}

async fn with_cors_headers(mut response: Response) -> Response
{   let headers = response.headers_mut();
    headers.insert(
      header::ACCESS_CONTROL_ALLOW_ORIGIN,
      HeaderValue::from_static("*")
    );
    headers.insert(
      header::ACCESS_CONTROL_ALLOW_METHODS,
      HeaderValue::from_static(ALLOWED_METHODS)
    );
    headers.insert(
      header::ACCESS_CONTROL_ALLOW_HEADERS,
      HeaderValue::from_static(ALLOWED_HEADERS)
    );
    response
}
