//! Pure NEW / FOLLOW_UP classification of an utterance.

use serde::{Deserialize, Serialize};

use crate::vocabulary::{PhraseScanner, normalize_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    New,
    FollowUp,
}

/// Utterances this short almost always lean on the previous turn.
const SHORT_UTTERANCE_WORDS: usize = 4;

const LEADING_REFERENCES: &[&str] = &[
    "them", "they", "these", "those", "that", "this", "he", "she", "his", "her", "their", "any",
];

const LEADING_CONJUNCTIONS: &[&str] = &["and", "or", "but", "also"];

const FOLLOW_UP_STARTERS: &[&str] = &[
    "what about",
    "how about",
    "and what about",
    "what if",
    "are there",
    "do they",
    "are any",
    "can any",
    "are they",
];

const CONTINUATION_PHRASES: &[&str] = &[
    "what about",
    "how about",
    "instead of",
    "rather than",
    "of them",
    "of those",
    "from them",
    "from those",
    "as well",
    "in addition",
    "apart from",
];

const AVAILABILITY_TERMS: &[&str] = &[
    "available",
    "unavailable",
    "availability",
    "free",
    "busy",
    "booked",
    "scheduled",
    "week",
    "weeks",
    "status",
    "hours",
];

pub fn classify(utterance: &str) -> QueryKind {
    let text = normalize_text(utterance);
    let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();
    let Some(first) = words.first() else {
        return QueryKind::New;
    };

    let padded = format!(" {text} ");
    let has_phrase = |phrase: &str| padded.contains(&format!(" {phrase} "));

    let follow_up = words.len() <= SHORT_UTTERANCE_WORDS
        || LEADING_REFERENCES.contains(first)
        || LEADING_CONJUNCTIONS.contains(first)
        || FOLLOW_UP_STARTERS
            .iter()
            .any(|starter| padded.starts_with(&format!(" {starter} ")))
        || CONTINUATION_PHRASES.iter().any(|phrase| has_phrase(phrase))
        || is_availability_only(&text, &words);

    if follow_up {
        QueryKind::FollowUp
    } else {
        QueryKind::New
    }
}

/// Mentions availability but names no location, skill, or rank.
fn is_availability_only(text: &str, words: &[&str]) -> bool {
    if !words.iter().any(|w| AVAILABILITY_TERMS.contains(w)) {
        return false;
    }
    let mut scanner = PhraseScanner::new(text);
    scanner.take_locations().is_empty()
        && scanner.take_skills().is_empty()
        && scanner.take_ranks().is_empty()
}
