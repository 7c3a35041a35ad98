use std::collections::HashMap;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use allm_proxy::config::{ProxyConfig, RequestDefaults};
use allm_proxy::error::{self, Error};
use allm_proxy::providers::{
  from_provider_response, to_provider_payload, ProviderPayload,
};
use allm_proxy::providers::gemini;
use allm_proxy::request::{ChatCompletion, Usage};
use allm_proxy::{CanonicalRequest, ChatMessage, Provider, ProviderResult, Role};

fn request_with_model(model: &str) -> CanonicalRequest
{   let mut request = CanonicalRequest::from_messages(vec![
      ChatMessage::system("Be brief")
    , ChatMessage::user("What is TCP?")
    ]);
    request.model = model.to_string();
    request
}

fn lookup<'a>(vars: &'a HashMap<&'a str, &'a str>)
  -> impl Fn(&str) -> Option<String> + 'a
{   move |name: &str| vars.get(name).map(|v| v.to_string())
}

// ===== Request normalization =====

#[test]
fn test_prompt_is_wrapped_with_system_message()
{   let request = assert_ok!(CanonicalRequest::parse(
      br#"{"prompt":"Hi","system":"Answer in French"}"#,
      &RequestDefaults::default()
    ));
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.messages[1], ChatMessage::user("Hi"));
    assert_eq!(request.model, "gpt-4o-mini");
    assert_eq!(request.max_tokens, 2000);
    assert!(request.provider.is_none());
}

#[test]
fn test_messages_win_over_prompt()
{   let request = assert_ok!(CanonicalRequest::parse(
      br#"{"provider":"Gemini","prompt":"ignored","messages":[{"role":"user","content":"used"}]}"#,
      &RequestDefaults::default()
    ));
    assert_eq!(request.provider, Some(Provider::Gemini));
    assert_eq!(request.messages, vec![ChatMessage::user("used")]);
}

#[test]
fn test_unusable_bodies_are_rejected()
{   let defaults = RequestDefaults::default();
    let bodies: [&[u8]; 6] = [
      b""
    , b"   \n"
    , b"{not json"
    , br#"{"messages":[]}"#
    , br#"{"provider":"fallback","prompt":"Hi"}"#
    , br#"{"prompt":"Hi","temperature":-1}"#
    ];
    for body in bodies
    {   let err = assert_err!(CanonicalRequest::parse(body, &defaults));
        assert!(err.is_caller_error());
        assert_eq!(err.status_code(), 400);
    }
}

// ===== OpenAI translation =====

#[test]
fn test_openai_payload_keeps_messages_and_swaps_gemini_models()
{   let request = request_with_model("gemini-1.5-pro");
    let payload = match to_provider_payload(Provider::OpenAI, &request)
    {   Some(ProviderPayload::OpenAI(payload)) => payload
      , other => panic!("unexpected payload: {:?}", other)
    };
    assert_eq!(payload.model, "gpt-4o-mini");
    assert_eq!(payload.messages, request.messages);

    let body = serde_json::to_value(&payload).unwrap();
    assert!(body.get("response_format").is_none());
    assert_eq!(body["max_tokens"], 2000);
}

#[test]
fn test_openai_response_parsing()
{   let ok = json!({
      "choices": [ { "message": { "role": "assistant", "content": "Hi" } } ]
    }).to_string();
    let result = assert_ok!(from_provider_response(Provider::OpenAI, 200, &ok));
    assert_eq!(result.text, "Hi");
    assert_eq!(result.raw.unwrap()["choices"][0]["message"]["content"], "Hi");

    let err = assert_err!(
      from_provider_response(Provider::OpenAI, 200, r#"{"choices":[]}"#)
    );
    assert!(matches!(err, Error::MalformedUpstreamResponse { .. }));
    assert_eq!(err.status_code(), 502);

    let err = assert_err!(
      from_provider_response(Provider::OpenAI, 200, "<html>")
    );
    assert!(matches!(err, Error::MalformedUpstreamResponse { .. }));
}

#[test]
fn test_non_2xx_carries_a_bounded_excerpt()
{   let body = "x".repeat(1000);
    let err = assert_err!(from_provider_response(Provider::OpenAI, 500, &body));
    match &err
    {   Error::UpstreamHttpError { status, body_excerpt, .. } => {
          assert_eq!(*status, 500);
          assert_eq!(
            body_excerpt.chars().count(),
            error::BODY_EXCERPT_CHARS + 3
          );
        }
      , other => panic!("unexpected error: {:?}", other)
    }
    assert_eq!(err.status_code(), 500);
    assert!(!err.to_string().contains("xxx"));

    let err = Error::UpstreamHttpError
    {   provider: Provider::Gemini
      , status: 302
      , body_excerpt: String::new()
    };
    assert_eq!(err.status_code(), 502);
    assert!(err.details().is_none());
}

// ===== Gemini translation =====

#[test]
fn test_gemini_model_selection()
{   assert_eq!(gemini::select_model("gemini-pro"), "gemini-1.5-pro");
    assert_eq!(gemini::select_model("gemini-1.5-flash-8b"), "gemini-1.5-flash-8b");
    assert_eq!(gemini::select_model("gpt-4o-mini"), "gemini-1.5-flash");
    assert_eq!(gemini::select_model(""), "gemini-1.5-flash");
}

#[test]
fn test_gemini_model_ids_outside_plain_charset_are_replaced()
{   for model in [
      "gemini-x/../../evil"
    , "gemini-1.5-flash?alt=sse"
    , "gemini-1.5-flash#frag"
    , "gemini 1.5"
    , "gemini-1.5-flash/"
    ]
    {   assert_eq!(gemini::select_model(model), "gemini-1.5-flash", "{}", model);
    }
}

#[test]
fn test_gemini_payload_flattens_messages()
{   let mut request = request_with_model("gpt-4o-mini");
    request.temperature = 0.5;
    request.max_tokens = 300;

    let payload = match to_provider_payload(Provider::Gemini, &request)
    {   Some(ProviderPayload::Gemini(payload)) => payload
      , other => panic!("unexpected payload: {:?}", other)
    };
    assert_eq!(payload.model, "gemini-1.5-flash");

    let body = serde_json::to_value(&payload.body).unwrap();
    assert_eq!(
      body,
      json!({
        "contents": [ { "parts": [ { "text": "Be brief\nWhat is TCP?\n" } ] } ],
        "generationConfig": {
          "temperature": 0.5,
          "maxOutputTokens": 300,
          "topK": 40,
          "topP": 0.95f32
        }
      })
    );
}

#[test]
fn test_gemini_response_parsing()
{   let ok = json!({
      "candidates": [ { "content": { "parts": [ { "text": "Bonjour" } ] } } ]
    }).to_string();
    let result = assert_ok!(from_provider_response(Provider::Gemini, 200, &ok));
    assert_eq!(result.provider, Provider::Gemini);
    assert_eq!(result.text, "Bonjour");

    let err = assert_err!(from_provider_response(
      Provider::Gemini, 200, r#"{"candidates":[{"content":{"parts":[]}}]}"#
    ));
    assert!(matches!(
      err,
      Error::MalformedUpstreamResponse { provider: Provider::Gemini, .. }
    ));

    let err = assert_err!(
      from_provider_response(Provider::Gemini, 403, "denied")
    );
    assert_eq!(err.status_code(), 403);
    assert_eq!(err.details(), Some("denied"));
}

#[test]
fn test_local_generator_has_no_wire_form()
{   let request = request_with_model("gpt-4o-mini");
    assert!(to_provider_payload(Provider::Local, &request).is_none());
    assert_err!(from_provider_response(Provider::Local, 200, "{}"));
}

// ===== OpenAI-compatible wrapping =====

#[test]
fn test_usage_is_a_quarter_of_characters_rounded_up()
{   assert_eq!(
      Usage::estimate("abcde", "abc"),
      Usage { prompt_tokens: 2, completion_tokens: 1, total_tokens: 2 }
    );
    assert_eq!(
      Usage::estimate("", ""),
      Usage { prompt_tokens: 0, completion_tokens: 0, total_tokens: 0 }
    );
    // counted in characters, not bytes
    assert_eq!(Usage::estimate("привет", "").prompt_tokens, 2);
}

#[test]
fn test_chat_completion_wraps_result()
{   let request = request_with_model("gemini-pro");
    let result = ProviderResult
    {   provider: Provider::Gemini
      , text: "Transmission Control Protocol".to_string()
      , raw: None
    };
    let completion = ChatCompletion::from_result(&result, &request);

    assert_eq!(completion.object, "chat.completion");
    assert_eq!(completion.model, "gemini-pro");
    assert_eq!(completion.choices.len(), 1);
    assert_eq!(completion.choices[0].message.role, Role::Assistant);
    assert_eq!(
      completion.usage,
      Usage::estimate(&request.joined_text(), &result.text)
    );
}

// ===== Config =====

#[test]
fn test_env_overrides_apply()
{   let vars = HashMap::from([
      ("OPENAI_API_KEY", "sk-env")
    , ("GEMINI_API_BASE", "http://localhost:9999")
    , ("ALLM_PROXY_TIMEOUT_SECS", "15")
    , ("PORT", "8080")
    ]);
    let config = assert_ok!(
      ProxyConfig::default().with_env_overrides(lookup(&vars))
    );

    assert_eq!(config.openai.credential(), Some("sk-env"));
    assert_eq!(config.gemini.credential(), None);
    assert_eq!(config.gemini.api_base, "http://localhost:9999");
    assert_eq!(config.timeout_secs, 15);
    assert_eq!(config.bind_addr, "0.0.0.0:8080");
}

#[test]
fn test_explicit_addr_beats_port()
{   let vars = HashMap::from([
      ("PORT", "8080")
    , ("ALLM_PROXY_ADDR", "127.0.0.1:4000")
    ]);
    let config = assert_ok!(
      ProxyConfig::default().with_env_overrides(lookup(&vars))
    );
    assert_eq!(config.bind_addr, "127.0.0.1:4000");
}

#[test]
fn test_bad_env_values_are_config_errors()
{   for (name, value) in [
      ("ALLM_PROXY_TIMEOUT_SECS", "soon")
    , ("ALLM_PROXY_TIMEOUT_SECS", "0")
    , ("PORT", "99999")
    ]
    {   let vars = HashMap::from([(name, value)]);
        let err = assert_err!(
          ProxyConfig::default().with_env_overrides(lookup(&vars))
        );
        assert!(matches!(err, Error::InvalidConfiguration(_)));
        assert_eq!(err.status_code(), 500);
    }
}

#[test]
fn test_blank_key_means_unavailable()
{   let mut config = ProxyConfig::default();
    config.gemini.api_key = Some("   ".to_string());
    assert!(config.gemini.credential().is_none());
}

#[test]
fn test_config_file_keeps_provider_bases()
{   let path = std::env::temp_dir().join(
      format!("allm-proxy-config-{}.json", std::process::id())
    );
    std::fs::write(&path, json!({
      "gemini": { "api_key": "g-file" },
      "timeout_secs": 30,
      "defaults": { "temperature": 0.7 }
    }).to_string()).unwrap();

    let loaded = ProxyConfig::from_file(path.to_str().unwrap());
    std::fs::remove_file(&path).unwrap();
    let config = assert_ok!(loaded);

    assert_eq!(config.gemini.credential(), Some("g-file"));
    assert_eq!(config.gemini.api_base, "https://generativelanguage.googleapis.com");
    assert_eq!(config.openai.api_base, "https://api.openai.com");
    assert!(config.openai.credential().is_none());
    assert_eq!(config.timeout_secs, 30);
    assert_eq!(config.defaults.max_tokens, 2000);
    assert!(!config.vocabulary.categories.is_empty());
}

#[test]
fn test_missing_config_file_is_a_config_error()
{   let err = assert_err!(
      ProxyConfig::from_file("/nonexistent/allm-proxy.json")
    );
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}
