//! Topic and question-count extraction from free instruction text

use once_cell::sync::Lazy;
use regex::Regex;
use log::trace;

pub const DEFAULT_TOPIC: &str = "general topic";
pub const DEFAULT_COUNT: usize = 3;
pub const MIN_COUNT: usize = 2;
pub const MAX_COUNT: usize = 8;

// "on the topic 'X'", "тема «X»"
static QUOTED_TOPIC: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r#"(?i)(?:topic|тем[аеуы])\s*:?\s*["'«“‘]([^"'»”’\n]+)["'»”’]"#
  ).expect("quoted topic pattern")
});

// "Topic: X" up to the end of the line
static LINE_TOPIC: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)(?:topic|тема)\s*:\s*([^\n]+)")
    .expect("line topic pattern")
});

static COUNT: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)(?:generate\s+(\d+)\s+(?:[\w-]+\s+){0,3}?questions?|сгенерируй\s+(\d+)\s+вопрос)"
  ).expect("count pattern")
});

/// What the local generator should write about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction
{   pub topic: String
  , pub count: usize
}

/// Recover topic and item count. Never fails; unmatched text
/// falls through to the defaults.
pub fn extract(text: &str) -> Extraction
{   let extraction = Extraction
    {   topic: extract_topic(text)
      , count: extract_count(text)
    };
    trace!("Extracted {:?}", extraction);
    extraction
}

pub fn extract_topic(text: &str) -> String
{   let captured = QUOTED_TOPIC.captures(text)
      .or_else(|| LINE_TOPIC.captures(text))
      .and_then(|c| c.get(1))
      .map(|m| m.as_str().trim().to_string())
      .filter(|t| !t.is_empty());

    captured.unwrap_or_else(|| DEFAULT_TOPIC.to_string())
}

pub fn extract_count(text: &str) -> usize
{   COUNT.captures(text)
      .and_then(|c| c.get(1).or_else(|| c.get(2)))
      .and_then(|m| m.as_str().parse::<usize>().ok())
      .map(clamp_count)
      .unwrap_or(DEFAULT_COUNT)
}

pub fn clamp_count(count: usize) -> usize
{   count.clamp(MIN_COUNT, MAX_COUNT)
}
