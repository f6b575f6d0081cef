//! Structured-field extraction from an utterance.
//!
//! The language model is asked for a JSON object; whatever comes back is
//! parsed tolerantly into `RawFields`. When the reply cannot be parsed (or
//! the call fails) the resolver falls back to `keyword_fields`, a fixed set
//! of rules over the utterance text.

use async_trait::async_trait;
use resgenie_core::error::ProviderError;
use resgenie_core::message::Message;
use resgenie_core::provider::{Provider, ProviderRequest};
use resgenie_core::{AvailabilityStatus, StructuredQuery};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::vocabulary::{CANONICAL_SKILLS, PhraseScanner, RANK_LEVELS, REGIONS, normalize_text};

/// Un-normalized fields as extracted. Values may be unknown to the
/// vocabulary; the resolver filters them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub locations: Vec<String>,
    pub ranks: Vec<String>,
    pub skills: Vec<String>,
    pub weeks: Vec<i64>,
    pub availability_status: Vec<String>,
    pub min_hours: Option<i64>,
}

impl RawFields {
    /// Read fields from a JSON object. Accepts the legacy single-valued
    /// keys (`location`, `rank`, `skill`, `availability`), scalars where
    /// lists are expected, and numeric strings where integers are expected.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let field = |plural: &str, legacy: &str| object.get(plural).or_else(|| object.get(legacy));

        Some(Self {
            locations: string_list(field("locations", "location")),
            ranks: string_list(field("ranks", "rank")),
            skills: string_list(field("skills", "skill")),
            weeks: int_list(field("weeks", "availability")),
            availability_status: string_list(field("availability_status", "status")),
            min_hours: object.get("min_hours").and_then(as_int),
        })
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let as_string = |v: &Value| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(as_string).collect(),
        Some(other) => as_string(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn int_list(value: Option<&Value>) -> Vec<i64> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(as_int).collect(),
        Some(other) => as_int(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let digits = s.trim().trim_start_matches(|c: char| !c.is_ascii_digit() && c != '-');
            digits.trim_end_matches(|c: char| !c.is_ascii_digit()).parse().ok()
        }
        _ => None,
    }
}

/// What came back from the extraction collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Parsed(RawFields),
    /// The raw reply, kept for logging.
    Malformed(String),
}

/// Parse a model reply: a fenced code block first, then the first balanced
/// `{...}` anywhere in the text.
pub fn parse_extraction(reply: &str) -> ExtractionOutcome {
    let candidates = fenced_block(reply).into_iter().chain(balanced_object(reply));
    for candidate in candidates {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            if let Some(fields) = RawFields::from_value(&value) {
                return ExtractionOutcome::Parsed(fields);
            }
        }
    }
    ExtractionOutcome::Malformed(reply.to_string())
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let body = &text[open + 3..];
    let body = body.strip_prefix("json").unwrap_or(body);
    let close = body.find("```")?;
    Some(body[..close].trim())
}

fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// The NL-extraction collaborator.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract fields from `utterance`. `prior` is a hint for follow-ups
    /// only; the extractor should return just what this utterance adds.
    async fn extract(
        &self,
        utterance: &str,
        prior: Option<&StructuredQuery>,
    ) -> Result<ExtractionOutcome, ProviderError>;
}

/// Extraction through any chat-completion `Provider`.
pub struct LlmExtractor {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmExtractor {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: 1000,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn build_messages(utterance: &str, prior: Option<&StructuredQuery>) -> Vec<Message> {
        let mut messages = vec![Message::system(system_prompt())];

        let mut user = format!("Query: {utterance}");
        if let Some(prior) = prior {
            let context = serde_json::to_string_pretty(prior).unwrap_or_default();
            user.push_str(&format!(
                "\n\nThis is a FOLLOW-UP. The previous query resolved to:\n{context}\n\
                 Return only the fields this query adds or changes. If it is a \
                 completely new search, return a complete set of fields."
            ));
        }
        messages.push(Message::user(user));
        messages
    }
}

fn system_prompt() -> String {
    let regions = REGIONS
        .iter()
        .map(|(name, members)| format!("  - {name}: {}", members.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");
    let ranks = RANK_LEVELS
        .iter()
        .map(|level| format!("  - {}", level.join(" = ")))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You convert staffing questions into JSON filters.\n\n\
         Fields (omit any that are not mentioned):\n\
         - locations: list of cities or regions\n\
         - ranks: list of ranks, or a phrase like \"above Consultant\"\n\
         - skills: list of skills\n\
         - weeks: list of week numbers (1-52)\n\
         - availability_status: any of \"available\", \"partial\", \"unavailable\"\n\
         - min_hours: minimum available hours per week\n\n\
         Regions:\n{regions}\n\n\
         Ranks, highest first (\"=\" marks the same level):\n{ranks}\n\n\
         Skills: {skills}.\n\
         Agile Coach, Scrum Master, Data Engineer and Cloud Engineer are skills, not ranks.\n\n\
         Example: \"partners in nordics\" -> {{\"locations\": [\"Nordics\"], \"ranks\": [\"Partner\"]}}\n\
         Example: \"frontend developers in London free in week 2\" -> \
         {{\"locations\": [\"London\"], \"skills\": [\"Frontend Developer\"], \"weeks\": [2], \
         \"availability_status\": [\"available\"]}}\n\n\
         Return ONLY the JSON object.",
        skills = CANONICAL_SKILLS.join(", "),
    )
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract(
        &self,
        utterance: &str,
        prior: Option<&StructuredQuery>,
    ) -> Result<ExtractionOutcome, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: Self::build_messages(utterance, prior),
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
        };

        let response = self.provider.complete(request).await?;
        debug!(provider = self.provider.name(), reply = %response.message.content, "Extraction reply");
        Ok(parse_extraction(&response.message.content))
    }
}

/// Deterministic extraction over the utterance text.
///
/// Picks up regions and cities, canonical skills and their synonyms, full
/// rank names (so "partner" → Partner), "week N" mentions, availability
/// words and "N hours".
pub fn keyword_fields(utterance: &str) -> RawFields {
    let mut scanner = PhraseScanner::new(utterance);
    let locations = scanner.take_locations();
    let skills = scanner.take_skills();
    let ranks = scanner.take_ranks();

    let text = normalize_text(utterance);
    let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();

    RawFields {
        locations: locations.into_iter().map(String::from).collect(),
        ranks: ranks.into_iter().map(String::from).collect(),
        skills: skills.into_iter().map(String::from).collect(),
        weeks: week_mentions(&words),
        availability_status: status_mentions(&text)
            .into_iter()
            .map(|s| s.to_string())
            .collect(),
        min_hours: hours_mention(&words),
    }
}

/// Highest week number a range is expanded up to.
const LAST_WEEK: i64 = 52;

fn is_hours_unit(word: &str) -> bool {
    matches!(word, "hours" | "hour" | "hrs" | "hr" | "h")
}

/// "week 3", "weeks 2 and 4", "weeks 1-3", "week 2 to 5", "w4".
///
/// A range past `LAST_WEEK` is not expanded; its end is kept as a single
/// value for the resolver to drop. A number followed by an hours unit ends
/// the list.
fn week_mentions(words: &[&str]) -> Vec<i64> {
    let mut weeks = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        if let Some(n) = word.strip_prefix('w').and_then(|rest| rest.parse::<i64>().ok()) {
            weeks.push(n);
            i += 1;
            continue;
        }
        if !matches!(word, "week" | "weeks" | "wk" | "wks") {
            i += 1;
            continue;
        }

        i += 1;
        let mut range_pending = false;
        while i < words.len() {
            match words[i] {
                "and" | "or" => {}
                "to" | "through" | "until" => range_pending = true,
                token => {
                    let Ok(n) = token.parse::<i64>() else { break };
                    if words.get(i + 1).is_some_and(|next| is_hours_unit(next)) {
                        break;
                    }
                    match (range_pending, weeks.last().copied()) {
                        (true, Some(from)) if from < n && n <= LAST_WEEK => weeks.extend(from + 1..=n),
                        _ => weeks.push(n),
                    }
                    range_pending = false;
                }
            }
            i += 1;
        }
    }
    weeks.dedup();
    weeks
}

fn status_mentions(text: &str) -> Vec<AvailabilityStatus> {
    const PHRASES: &[(&str, AvailabilityStatus)] = &[
        ("partially available", AvailabilityStatus::Partial),
        ("partly available", AvailabilityStatus::Partial),
        ("part time", AvailabilityStatus::Partial),
        ("partial", AvailabilityStatus::Partial),
        ("not available", AvailabilityStatus::Unavailable),
        ("unavailable", AvailabilityStatus::Unavailable),
        ("busy", AvailabilityStatus::Unavailable),
        ("booked", AvailabilityStatus::Unavailable),
        ("available", AvailabilityStatus::Available),
        ("free", AvailabilityStatus::Available),
    ];

    let mut remaining = format!(" {text} ");
    let mut found = Vec::new();
    for (phrase, status) in PHRASES {
        let needle = format!(" {phrase} ");
        if remaining.contains(&needle) {
            remaining = remaining.replace(&needle, " ");
            if !found.contains(status) {
                found.push(*status);
            }
        }
    }
    found
}

/// "20 hours", "20+ hours", "at least 20 hrs".
fn hours_mention(words: &[&str]) -> Option<i64> {
    words.windows(2).find_map(|pair| {
        is_hours_unit(pair[1])
            .then(|| pair[0].trim_end_matches('+').parse().ok())
            .flatten()
    })
}
