//! QueryResolver: utterance (+ prior query) → canonical `StructuredQuery`.
//!
//! Steps, in order:
//! 1. classify NEW / FOLLOW_UP
//! 2. extract fields (the prior query is a hint only for follow-ups)
//! 3. normalize against the vocabulary, dropping what it does not know
//! 4. merge with the prior query unless the utterance stands alone
//!
//! Resolution never fails: a bad extraction degrades to keyword rules.

use resgenie_core::{AvailabilityStatus, StructuredQuery};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::extraction::{ExtractionOutcome, Extractor, RawFields, keyword_fields};
use crate::followup::{QueryKind, classify};
use crate::hierarchy::{RankHierarchyResolver, RankRelation, parse_relation};
use crate::vocabulary::{canonical_rank, canonical_skill, expand_location};

/// Where the extracted fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationSource {
    Model,
    KeywordFallback,
}

/// A resolved query plus how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub query: StructuredQuery,
    pub classification: QueryKind,
    pub source: TranslationSource,
    /// Dropped tokens, rank explanations, and merge decisions.
    pub notes: Vec<String>,
}

pub struct QueryResolver {
    extractor: Arc<dyn Extractor>,
    hierarchy: RankHierarchyResolver,
}

impl QueryResolver {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self {
            extractor,
            hierarchy: RankHierarchyResolver::new(),
        }
    }

    pub fn with_hierarchy(mut self, hierarchy: RankHierarchyResolver) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    /// Resolve an utterance into its canonical query.
    pub async fn translate(&self, utterance: &str, prior: Option<&StructuredQuery>) -> StructuredQuery {
        self.resolve(utterance, prior).await.query
    }

    /// Like `translate`, keeping classification, source, and notes.
    pub async fn resolve(&self, utterance: &str, prior: Option<&StructuredQuery>) -> Translation {
        let classification = classify(utterance);
        let hint = prior.filter(|_| classification == QueryKind::FollowUp);
        let mut notes = Vec::new();

        let (fields, source) = match self.extractor.extract(utterance, hint).await {
            Ok(ExtractionOutcome::Parsed(fields)) => (fields, TranslationSource::Model),
            Ok(ExtractionOutcome::Malformed(reply)) => {
                warn!(reply = %reply, "Extraction reply was not JSON, using keyword rules");
                notes.push("extraction reply unparseable; used keyword rules".to_string());
                (keyword_fields(utterance), TranslationSource::KeywordFallback)
            }
            Err(e) => {
                warn!(error = %e, "Extraction call failed, using keyword rules");
                notes.push(format!("extraction failed ({e}); used keyword rules"));
                (keyword_fields(utterance), TranslationSource::KeywordFallback)
            }
        };

        let extracted = self.normalize(fields, utterance, &mut notes);

        let query = match hint {
            Some(_) if extracted.is_complete_search() => {
                notes.push("complete search; prior context discarded".to_string());
                extracted
            }
            Some(prior) => merge(prior, extracted),
            None => extracted,
        };

        debug!(
            classification = ?classification,
            source = ?source,
            locations = ?query.locations,
            ranks = ?query.ranks,
            skills = ?query.skills,
            weeks = ?query.weeks,
            "Query resolved"
        );

        Translation {
            query,
            classification,
            source,
            notes,
        }
    }

    fn normalize(&self, fields: RawFields, utterance: &str, notes: &mut Vec<String>) -> StructuredQuery {
        let mut query = StructuredQuery::default();

        for token in &fields.locations {
            let expanded = expand_location(token);
            if expanded.is_empty() {
                notes.push(format!("dropped unknown location '{token}'"));
            }
            query.locations.extend(expanded.into_iter().map(String::from));
        }

        for token in &fields.skills {
            match canonical_skill(token) {
                Some(skill) => {
                    query.skills.insert(skill.to_string());
                }
                None => notes.push(format!("dropped unknown skill '{token}'")),
            }
        }

        self.resolve_ranks(&fields.ranks, utterance, &mut query, notes);

        for week in fields.weeks {
            match u8::try_from(week) {
                Ok(w) if (1..=52).contains(&w) => {
                    query.weeks.insert(w);
                }
                _ => notes.push(format!("dropped out-of-range week {week}")),
            }
        }

        for raw in &fields.availability_status {
            match AvailabilityStatus::parse(raw) {
                Some(status) => {
                    query.availability_status.insert(status);
                }
                None => notes.push(format!("dropped unknown availability status '{raw}'")),
            }
        }

        query.min_hours = fields.min_hours.and_then(|h| u32::try_from(h).ok());
        query
    }

    /// A relational phrase in the utterance wins over extracted rank tokens.
    /// Otherwise each token is a relation, a rank, or a skill misfiled as a
    /// rank.
    fn resolve_ranks(&self, tokens: &[String], utterance: &str, query: &mut StructuredQuery, notes: &mut Vec<String>) {
        if let Some(relation) = parse_relation(utterance) {
            self.apply_relation(&relation, query, notes);
            return;
        }

        let mut plain = Vec::new();
        for token in tokens {
            if canonical_rank(token).is_none() {
                if let Some(skill) = canonical_skill(token) {
                    notes.push(format!("'{token}' is a skill, not a rank"));
                    query.skills.insert(skill.to_string());
                    continue;
                }
                if let Some(relation) = parse_relation(token) {
                    self.apply_relation(&relation, query, notes);
                    continue;
                }
            }
            plain.push(token.clone());
        }

        if !plain.is_empty() {
            self.apply_relation(&RankRelation::List(plain), query, notes);
        }
    }

    fn apply_relation(&self, relation: &RankRelation, query: &mut StructuredQuery, notes: &mut Vec<String>) {
        let resolution = self.hierarchy.resolve_relation(relation);
        if let Some(explanation) = resolution.explanation {
            notes.push(explanation);
        }
        query.ranks.extend(resolution.ranks.into_iter().map(String::from));
    }
}

/// Fold a follow-up's fields into the prior query.
///
/// Missing fields inherit; weeks accumulate; status and `min_hours`
/// replace when given.
fn merge(prior: &StructuredQuery, new: StructuredQuery) -> StructuredQuery {
    let inherit = |fresh: BTreeSet<String>, old: &BTreeSet<String>| {
        if fresh.is_empty() { old.clone() } else { fresh }
    };

    let mut weeks = prior.weeks.clone();
    weeks.extend(new.weeks);

    StructuredQuery {
        locations: inherit(new.locations, &prior.locations),
        ranks: inherit(new.ranks, &prior.ranks),
        skills: inherit(new.skills, &prior.skills),
        weeks,
        availability_status: if new.availability_status.is_empty() {
            prior.availability_status.clone()
        } else {
            new.availability_status
        },
        min_hours: new.min_hours.or(prior.min_hours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use resgenie_core::ProviderError;
    use std::sync::Mutex;

    /// Returns scripted replies and records the prior hint it was given.
    struct ScriptedExtractor {
        replies: Mutex<Vec<Result<ExtractionOutcome, ProviderError>>>,
        hints: Mutex<Vec<Option<StructuredQuery>>>,
    }

    impl ScriptedExtractor {
        fn json(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .iter()
                        .rev()
                        .map(|r| Ok(crate::extraction::parse_extraction(r)))
                        .collect(),
                ),
                hints: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(vec![Err(ProviderError::Timeout("60s".into()))]),
                hints: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Extractor for ScriptedExtractor {
        async fn extract(
            &self,
            _utterance: &str,
            prior: Option<&StructuredQuery>,
        ) -> Result<ExtractionOutcome, ProviderError> {
            self.hints.lock().unwrap().push(prior.cloned());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Ok(ExtractionOutcome::Malformed(String::new())))
        }
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn partners_in_nordics() {
        let resolver = QueryResolver::new(ScriptedExtractor::json(&[
            r#"{"locations": ["Nordics"], "ranks": ["Partner"]}"#,
        ]));
        let t = resolver.resolve("partners in nordics", None).await;
        assert_eq!(t.source, TranslationSource::Model);
        assert_eq!(t.query.locations, set(&["Oslo", "Stockholm", "Copenhagen"]));
        assert_eq!(t.query.ranks, set(&["Partner"]));
        assert!(t.query.skills.is_empty());
    }

    #[tokio::test]
    async fn follow_up_inherits_missing_fields() {
        let extractor = ScriptedExtractor::json(&[r#"{"weeks": [2], "availability_status": ["available"]}"#]);
        let resolver = QueryResolver::new(extractor.clone());
        let prior = StructuredQuery {
            locations: set(&["London"]),
            skills: set(&["Frontend Developer"]),
            ..StructuredQuery::default()
        };

        let t = resolver.resolve("Are any of them available in week 2?", Some(&prior)).await;
        assert_eq!(t.classification, QueryKind::FollowUp);
        assert_eq!(t.query.locations, set(&["London"]));
        assert_eq!(t.query.skills, set(&["Frontend Developer"]));
        assert_eq!(t.query.weeks, BTreeSet::from([2]));
        assert_eq!(
            t.query.availability_status,
            BTreeSet::from([AvailabilityStatus::Available])
        );
        assert_eq!(extractor.hints.lock().unwrap()[0].as_ref(), Some(&prior));
    }

    #[tokio::test]
    async fn weeks_accumulate_and_status_replaces() {
        let resolver = QueryResolver::new(ScriptedExtractor::json(&[
            r#"{"skills": ["Data Engineer"], "weeks": [1], "availability_status": ["available"]}"#,
            r#"{"weeks": [3], "availability_status": ["partial"]}"#,
        ]));

        let first = resolver.translate("data engineers available week 1", None).await;
        assert_eq!(first.weeks, BTreeSet::from([1]));

        let second = resolver.translate("and week 3?", Some(&first)).await;
        assert_eq!(second.weeks, BTreeSet::from([1, 3]));
        assert_eq!(second.skills, set(&["Data Engineer"]));
        assert_eq!(
            second.availability_status,
            BTreeSet::from([AvailabilityStatus::Partial])
        );
    }

    #[tokio::test]
    async fn complete_search_discards_prior() {
        let resolver = QueryResolver::new(ScriptedExtractor::json(&[
            r#"{"locations": ["Nordics"], "ranks": ["Partner"]}"#,
        ]));
        let prior = StructuredQuery {
            locations: set(&["London"]),
            skills: set(&["Frontend Developer"]),
            weeks: BTreeSet::from([4]),
            ..StructuredQuery::default()
        };

        let t = resolver.resolve("show me partners in nordics", Some(&prior)).await;
        assert_eq!(t.classification, QueryKind::FollowUp);
        assert!(t.query.skills.is_empty());
        assert!(t.query.weeks.is_empty());
        assert_eq!(t.query.ranks, set(&["Partner"]));
        assert!(t.notes.iter().any(|n| n.contains("prior context discarded")));
    }

    #[tokio::test]
    async fn new_query_ignores_prior() {
        let extractor = ScriptedExtractor::json(&[r#"{"skills": ["scrum"]}"#]);
        let resolver = QueryResolver::new(extractor.clone());
        let prior = StructuredQuery {
            locations: set(&["Chicago"]),
            ..StructuredQuery::default()
        };

        let t = resolver
            .resolve("I need somebody who can run scrum ceremonies for a big client", Some(&prior))
            .await;
        assert_eq!(t.classification, QueryKind::New);
        assert!(t.query.locations.is_empty());
        assert_eq!(t.query.skills, set(&["Scrum Master"]));
        assert_eq!(extractor.hints.lock().unwrap()[0], None);
    }

    #[tokio::test]
    async fn relational_phrase_in_utterance_expands_ranks() {
        let resolver = QueryResolver::new(ScriptedExtractor::json(&[
            r#"{"locations": ["UK"], "ranks": ["above Consultant Analyst"]}"#,
        ]));
        let t = resolver
            .resolve("Find people above consultant analyst in the UK", None)
            .await;
        assert_eq!(
            t.query.ranks,
            set(&[
                "Partner",
                "Associate Partner",
                "Consulting Director",
                "Management Consultant",
                "Principal Consultant",
                "Senior Consultant",
                "Consultant",
            ])
        );
        assert!(!t.query.ranks.contains("Analyst"));
        assert_eq!(t.query.locations.len(), 4);
    }

    #[tokio::test]
    async fn misfiled_ranks_and_unknown_tokens() {
        let resolver = QueryResolver::new(ScriptedExtractor::json(&[
            r#"{"locations": ["London", "Atlantis"], "ranks": ["Agile Coach", "consultant"], "skills": ["cobol"], "weeks": [0, 3, 60]}"#,
        ]));
        let t = resolver.resolve("agile coach consultants in London or Atlantis", None).await;
        assert_eq!(t.query.locations, set(&["London"]));
        assert_eq!(t.query.skills, set(&["Agile Coach"]));
        assert_eq!(t.query.ranks, set(&["Consultant"]));
        assert_eq!(t.query.weeks, BTreeSet::from([3]));
        for expected in ["Atlantis", "cobol", "skill, not a rank", "week 0", "week 60"] {
            assert!(
                t.notes.iter().any(|n| n.contains(expected)),
                "missing note for {expected}: {:?}",
                t.notes
            );
        }
    }

    #[tokio::test]
    async fn malformed_reply_falls_back_to_keywords() {
        let resolver = QueryResolver::new(ScriptedExtractor::json(&["I think they want partners."]));
        let t = resolver.resolve("Any partners in the nordics?", None).await;
        assert_eq!(t.source, TranslationSource::KeywordFallback);
        assert_eq!(t.query.ranks, set(&["Partner"]));
        assert_eq!(t.query.locations, set(&["Oslo", "Stockholm", "Copenhagen"]));
    }

    #[tokio::test]
    async fn provider_error_falls_back_to_keywords() {
        let resolver = QueryResolver::new(ScriptedExtractor::failing());
        let t = resolver
            .resolve("frontend developers in London free in week 3", None)
            .await;
        assert_eq!(t.source, TranslationSource::KeywordFallback);
        assert_eq!(t.query.skills, set(&["Frontend Developer"]));
        assert_eq!(t.query.locations, set(&["London"]));
        assert_eq!(t.query.weeks, BTreeSet::from([3]));
        assert!(t.notes[0].contains("timed out"));
    }
}
