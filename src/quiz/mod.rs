//! Local template generator: the last step of the fallback chain.
//!
//! Builds a quiz from the topic and count found in the request text.
//! Item types alternate radio / checkbox by position; option draws and
//! display order come from the supplied random source.

pub mod vocabulary;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use log::debug;

use crate::extract;
use crate::request::{CanonicalRequest, ProviderResult};
use crate::Provider;
use vocabulary::{CategoryTable, TopicVocabulary};

pub const OPTIONS_PER_ITEM: usize = 4;
pub const CHECKBOX_CORRECT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType
{   /// Single choice
    Radio
  , /// Multiple choice
    Checkbox
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOption
{   pub text: String
  , pub correct: bool
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizItem
{   #[serde(rename = "type")]
    pub kind: QuestionType
  , pub title: String
  , pub required: bool
  , pub points: u32
  , pub options: Vec<QuizOption>
}

impl QuizItem
{   pub fn correct_count(&self) -> usize
    {   self.options.iter().filter(|o| o.correct).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSet
{   pub items: Vec<QuizItem>
}

/// Generate `count` items about `topic`
pub fn generate<R: Rng + ?Sized>(
  topic: &str
, count: usize
, vocabulary: &TopicVocabulary
, rng: &mut R
) -> QuizSet
{   let table = vocabulary.classify(topic);
    debug!(
      "Generating {} items on '{}' from {:?} vocabulary",
      count, topic, table.category
    );
    let items = (0..count)
      .map(|index| generate_item(topic, index, table, rng))
      .collect();
    QuizSet { items }
}

/// Answer a request locally. Cannot fail.
pub fn local_answer(
  request: &CanonicalRequest
, vocabulary: &TopicVocabulary
) -> ProviderResult
{   let found = extract::extract(&request.joined_text());
    let quiz = generate(
      &found.topic,
      found.count,
      vocabulary,
      &mut rand::thread_rng()
    );
    let text = serde_json::to_string(&quiz)
      .unwrap_or_else(|_| r#"{"items":[]}"#.to_string());
    ProviderResult
    {   provider: Provider::Local
      , text
      , raw: None
    }
}

fn generate_item<R: Rng + ?Sized>(
  topic: &str
, index: usize
, table: &CategoryTable
, rng: &mut R
) -> QuizItem
{   // 0-based even index is an odd 1-based position
    let kind = if index % 2 == 0
    {   QuestionType::Radio
    } else
    {   QuestionType::Checkbox
    };
    let correct = match kind
    {   QuestionType::Radio => 1
      , QuestionType::Checkbox => CHECKBOX_CORRECT
    };

    let mut options: Vec<QuizOption> = draw_terms(&table.terms, rng)
      .into_iter()
      .enumerate()
      .map(|(drawn, text)| QuizOption
      {   text
        , correct: drawn < correct
      })
      .collect();
    options.shuffle(rng);

    QuizItem
    {   kind
      , title: title_for(topic, index, kind, table)
      , required: true
      , points: 1
      , options
    }
}

/// Four distinct option texts. Tables with fewer than four distinct
/// terms are padded by reusing terms with a numeric suffix; an empty
/// table yields "Option N".
fn draw_terms<R: Rng + ?Sized>(
  terms: &[String]
, rng: &mut R
) -> Vec<String>
{   let mut unique: Vec<&String> = Vec::with_capacity(terms.len());
    for term in terms
    {   if !term.trim().is_empty() && !unique.contains(&term)
        {   unique.push(term);
        }
    }
    unique.shuffle(rng);

    let mut drawn: Vec<String> = unique
      .iter()
      .take(OPTIONS_PER_ITEM)
      .map(|t| t.to_string())
      .collect();

    let mut round = 2;
    while drawn.len() < OPTIONS_PER_ITEM
    {   if unique.is_empty()
        {   drawn.push(format!("Option {}", drawn.len() + 1));
            continue;
        }
        for term in &unique
        {   if drawn.len() == OPTIONS_PER_ITEM
            {   break;
            }
            let padded = format!("{} ({})", term, round);
            if !drawn.contains(&padded)
            {   drawn.push(padded);
            }
        }
        round += 1;
    }
    drawn
}

fn title_for(
  topic: &str
, index: usize
, kind: QuestionType
, table: &CategoryTable
) -> String
{   let templates = match kind
    {   QuestionType::Radio => &table.radio_titles
      , QuestionType::Checkbox => &table.checkbox_titles
    };
    match templates.get(index / 2 % templates.len().max(1))
    {   Some(template) => template.replace("{topic}", topic)
      , None => match kind
        {   QuestionType::Radio => {
              format!("What is the main principle of {}?", topic)
            }
          , QuestionType::Checkbox => {
              format!("Mark all correct statements about {}:", topic)
            }
        }
    }
}
