use serde::{Deserialize, Serialize};

/// Inferred category of a visitor question.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Technical,
    Business,
    Career,
    Contact,
    #[default]
    General,
}

const TECHNICAL_KEYWORDS: &[&str] = &[
    "code",
    "architecture",
    "technical",
    "implementation",
    "api",
    "database",
    "algorithm",
];

const BUSINESS_KEYWORDS: &[&str] = &[
    "roi",
    "impact",
    "business",
    "client",
    "project management",
    "timeline",
    "cost",
];

const CAREER_KEYWORDS: &[&str] = &[
    "experience",
    "skills",
    "background",
    "education",
    "career",
    "hire",
    "job",
];

const CONTACT_KEYWORDS: &[&str] = &[
    "contact",
    "email",
    "phone",
    "reach",
    "connect",
    "hire",
    "collaborate",
];

const RELEVANT_KEYWORDS: &[&str] = &[
    "dhruba",
    "project",
    "event manager",
    "gitiq",
    "portfolio",
    "website",
    "ai",
    "development",
    "developer",
    "programming",
    "code",
    "technology",
    "nit silchar",
    "civil engineering",
    "student",
    "experience",
    "skill",
    "hire",
    "contact",
    "email",
    "phone",
    "collaboration",
    "work",
    "react",
    "node",
    "typescript",
    "javascript",
    "firebase",
    "github",
    "orchestration",
    "prompt engineering",
    "full stack",
    "web development",
];

const OFF_TOPIC_KEYWORDS: &[&str] = &[
    "weather",
    "sports",
    "politics",
    "news",
    "cooking",
    "recipe",
    "movie",
    "music",
    "celebrity",
    "game",
    "joke",
    "story",
    "math problem",
    "homework",
    "assignment",
    "translate",
    "what is",
    "how to",
    "explain",
    "define",
];

const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good evening",
    "how are you",
    "what can you do",
    "help me",
];

/// Messages at or below this length are never considered off-topic.
const OFF_TOPIC_MIN_LEN: usize = 10;

/// Keyword-list classification. The check order (contact, technical,
/// business, career, general fallback) is a deliberate tie-break: a message
/// matching several sets resolves to the earliest-checked category.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, message: &str) -> Intent {
        let lower = message.to_lowercase();

        if contains_any(&lower, CONTACT_KEYWORDS) {
            return Intent::Contact;
        }
        if contains_any(&lower, TECHNICAL_KEYWORDS) {
            return Intent::Technical;
        }
        if contains_any(&lower, BUSINESS_KEYWORDS) {
            return Intent::Business;
        }
        if contains_any(&lower, CAREER_KEYWORDS) {
            return Intent::Career;
        }

        Intent::General
    }

    /// A message is off-topic when it carries an unrelated-topics keyword and
    /// nothing from the relevant set. Greetings and short messages pass.
    pub fn is_off_topic(&self, message: &str) -> bool {
        let lower = message.to_lowercase();

        let has_relevant = contains_any(&lower, RELEVANT_KEYWORDS);
        let has_off_topic = contains_any(&lower, OFF_TOPIC_KEYWORDS);

        if has_off_topic && !has_relevant {
            return true;
        }

        let is_greeting = contains_any(&lower, GREETINGS);

        !is_greeting && !has_relevant && lower.len() > OFF_TOPIC_MIN_LEN
    }
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}
