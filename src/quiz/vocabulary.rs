//! Topic-to-vocabulary table for the local generator.
//!
//! The built-in table is small and hand-curated. Deployments can swap
//! it through the `vocabulary` section of the config file.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicCategory
{   Networking
  , Programming
  , Mathematics
  , Generic
}

/// One row of the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTable
{   pub category: TopicCategory
  , /// Lowercase substrings that select this row
    #[serde(default)]
    pub keywords: Vec<String>
  , /// Option texts to draw from
    pub terms: Vec<String>
  , /// `{topic}` is substituted
    #[serde(default)]
    pub radio_titles: Vec<String>
  , #[serde(default)]
    pub checkbox_titles: Vec<String>
}

impl CategoryTable
{   fn matches(&self, lowered_topic: &str) -> bool
    {   self.keywords
          .iter()
          .any(|k| !k.is_empty()
            && lowered_topic.contains(&k.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicVocabulary
{   pub categories: Vec<CategoryTable>
}

impl TopicVocabulary
{   /// First keyword match wins, the generic row otherwise
    pub fn classify(&self, topic: &str) -> &CategoryTable
    {   let lowered = topic.to_lowercase();
        self.categories
          .iter()
          .filter(|c| c.category != TopicCategory::Generic)
          .find(|c| c.matches(&lowered))
          .or_else(|| self.categories
            .iter()
            .find(|c| c.category == TopicCategory::Generic))
          .unwrap_or(&*BUILTIN_GENERIC)
    }
}

impl Default for TopicVocabulary
{   fn default() -> Self
    {   TopicVocabulary
        {   categories: vec![
              networking()
            , programming()
            , mathematics()
            , BUILTIN_GENERIC.clone()
            ]
        }
    }
}

static BUILTIN_GENERIC: Lazy<CategoryTable> = Lazy::new(generic);

fn strings(items: &[&str]) -> Vec<String>
{   items.iter().map(|s| s.to_string()).collect()
}

fn networking() -> CategoryTable
{   CategoryTable
    {   category: TopicCategory::Networking
      , keywords: strings(&[
          "network", "сеть", "сети", "сетев", "set'", "seti", "setev"
        , "tcp", "udp", "dns", "http", "router", "маршрутиз"
        , "protocol", "протокол", "ethernet", "internet", "интернет"
        ])
      , terms: strings(&[
          "TCP", "UDP", "IP", "HTTP", "DNS", "DHCP"
        , "Ethernet", "BGP", "ARP", "ICMP"
        ])
      , radio_titles: strings(&[
          "Which protocol is used in {topic}?"
        , "Which protocol operates at the core of {topic}?"
        , "Which technology is essential for {topic}?"
        ])
      , checkbox_titles: strings(&[
          "Mark all technologies used in {topic}:"
        , "Select every protocol that belongs to {topic}:"
        ])
    }
}

fn programming() -> CategoryTable
{   CategoryTable
    {   category: TopicCategory::Programming
      , keywords: strings(&[
          "programming", "программ", "programm", "code", "код"
        , "algorithm", "алгоритм", "software", "developer", "разработ"
        , "rust", "python", "java", "c++"
        ])
      , terms: strings(&[
          "Variables", "Functions", "Loops", "Recursion"
        , "Classes", "Interfaces", "Closures", "Generics"
        ])
      , radio_titles: strings(&[
          "Which concept is central to {topic}?"
        , "Which construct is most often used in {topic}?"
        , "What is the key building block of {topic}?"
        ])
      , checkbox_titles: strings(&[
          "Mark all constructs used in {topic}:"
        , "Select every concept that applies to {topic}:"
        ])
    }
}

fn mathematics() -> CategoryTable
{   CategoryTable
    {   category: TopicCategory::Mathematics
      , keywords: strings(&[
          "math", "матем", "matem", "algebra", "алгебр"
        , "geometry", "геометр", "calculus", "arithmetic", "арифмет"
        , "statistic", "статист"
        ])
      , terms: strings(&[
          "Derivative", "Integral", "Matrix", "Vector"
        , "Prime number", "Logarithm", "Polynomial", "Set theory"
        ])
      , radio_titles: strings(&[
          "Which notion is fundamental to {topic}?"
        , "Which tool is most important in {topic}?"
        , "What underlies most results in {topic}?"
        ])
      , checkbox_titles: strings(&[
          "Mark all concepts that belong to {topic}:"
        , "Select every notion used in {topic}:"
        ])
    }
}

fn generic() -> CategoryTable
{   CategoryTable
    {   category: TopicCategory::Generic
      , keywords: Vec::new()
      , terms: strings(&[
          "Core principle", "Key factor", "Essential condition"
        , "Distinctive feature", "Defining trait"
        , "Necessary requirement", "Main characteristic"
        , "Important property"
        ])
      , radio_titles: strings(&[
          "What is the main principle of {topic}?"
        , "Which characteristic matters most for {topic}?"
        , "What determines the effectiveness of {topic}?"
        , "Which approach suits {topic} best?"
        , "What is the key factor in {topic}?"
        ])
      , checkbox_titles: strings(&[
          "Mark all correct statements about {topic}:"
        , "Select all characteristics of {topic}:"
        , "Which methods are used in {topic}?"
        , "Mark all important aspects of {topic}:"
        ])
    }
}
