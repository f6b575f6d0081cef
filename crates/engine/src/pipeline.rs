//! One request through the whole engine: resolve → match → availability,
//! optionally served from the response cache.

use crate::availability::AvailabilityResolver;
use crate::cache::{ResponseCache, fingerprint};
use crate::matcher::{FallbackNotice, MatchOutcome, ResourceMatcher};
use resgenie_config::AppConfig;
use resgenie_core::error::LookupError;
use resgenie_core::{AvailabilityWeek, Conversation, DocumentStore, Employee, Message, StructuredQuery};
use resgenie_resolver::{Extractor, QueryKind, QueryResolver, RankHierarchyResolver, TranslationSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Turns of history that feed the cache fingerprint.
const CONTEXT_TURNS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedEmployee {
    pub employee: Employee,
    /// Empty unless the query constrained availability.
    #[serde(default)]
    pub availability: Vec<AvailabilityWeek>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    Employees { employees: Vec<MatchedEmployee> },
    Broadened { notice: FallbackNotice },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub query: StructuredQuery,
    pub classification: QueryKind,
    pub source: TranslationSource,
    pub notes: Vec<String>,
    pub result: MatchResult,
    #[serde(skip)]
    pub from_cache: bool,
}

impl PipelineOutcome {
    /// One-line description used as the assistant's turn in the history.
    pub fn summary(&self) -> String {
        match &self.result {
            MatchResult::Employees { employees } => match employees.len() {
                0 => "No matching employees found.".to_string(),
                1 => "Found 1 matching employee.".to_string(),
                n => format!("Found {n} matching employees."),
            },
            MatchResult::Broadened { notice } => notice.message(),
        }
    }
}

/// Per-session state threaded between requests.
#[derive(Debug, Default)]
pub struct ConversationContext {
    pub prior_query: Option<StructuredQuery>,
    conversation: Conversation,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recent_turns(&self) -> Vec<String> {
        self.conversation.recent_turns(CONTEXT_TURNS)
    }

    pub fn record(&mut self, utterance: &str, outcome: &PipelineOutcome) {
        self.conversation.push(Message::user(utterance));
        self.conversation.push(Message::assistant(format!(
            "{} Searched {}.",
            outcome.summary(),
            describe_filter(&outcome.query)
        )));
        self.prior_query = Some(outcome.query.clone());
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Every field of the resolved filter, so the assistant turn (and with it
/// the cache fingerprint) pins down the query a follow-up will merge with.
fn describe_filter(query: &StructuredQuery) -> String {
    fn join<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
        values.into_iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
    }

    let mut parts = Vec::new();
    if !query.locations.is_empty() {
        parts.push(format!("locations: {}", join(&query.locations)));
    }
    if !query.ranks.is_empty() {
        parts.push(format!("ranks: {}", join(&query.ranks)));
    }
    if !query.skills.is_empty() {
        parts.push(format!("skills: {}", join(&query.skills)));
    }
    if !query.weeks.is_empty() {
        parts.push(format!("weeks: {}", join(&query.weeks)));
    }
    if !query.availability_status.is_empty() {
        parts.push(format!("status: {}", join(&query.availability_status)));
    }
    if let Some(hours) = query.min_hours {
        parts.push(format!("min hours: {hours}"));
    }

    if parts.is_empty() {
        "everyone".to_string()
    } else {
        parts.join("; ")
    }
}

pub struct Pipeline {
    resolver: QueryResolver,
    matcher: ResourceMatcher,
    availability: AvailabilityResolver,
    cache_ttl_secs: u64,
}

impl Pipeline {
    pub fn new(resolver: QueryResolver, matcher: ResourceMatcher, availability: AvailabilityResolver) -> Self {
        Self {
            resolver,
            matcher,
            availability,
            cache_ttl_secs: 3600,
        }
    }

    /// Wire the engine from configuration around an extractor and a store.
    pub fn from_config(
        config: &AppConfig,
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let resolver = QueryResolver::new(extractor).with_hierarchy(
            RankHierarchyResolver::new().with_between_coequals(config.resolver.between_includes_coequals),
        );
        let matcher = ResourceMatcher::new(store.clone())
            .with_any_of_limit(config.matcher.any_of_limit)
            .with_fallback_broadening(config.matcher.fallback_broadening);
        let availability =
            AvailabilityResolver::new(store).with_missing_weeks(config.availability.missing_weeks);

        Self::new(resolver, matcher, availability).with_cache_ttl(config.cache.ttl_secs)
    }

    pub fn with_cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.cache_ttl_secs = ttl_secs;
        self
    }

    /// Answer `utterance` and record the turn in `context`.
    ///
    /// A store failure leaves `context` untouched and is never cached.
    pub async fn run(
        &self,
        cache: Option<&mut ResponseCache>,
        utterance: &str,
        context: &mut ConversationContext,
    ) -> Result<PipelineOutcome, LookupError> {
        let snapshot = &*context;
        let outcome = match cache {
            Some(cache) => {
                let key = fingerprint(utterance, &snapshot.recent_turns());
                let hits_before = cache.stats().hits;
                let mut outcome = cache
                    .try_get_or_compute(&key, self.cache_ttl_secs, || self.execute(utterance, snapshot))
                    .await?;
                outcome.from_cache = cache.stats().hits > hits_before;
                if outcome.from_cache {
                    debug!(key = %key, "Served from response cache");
                }
                outcome
            }
            None => self.execute(utterance, snapshot).await?,
        };

        context.record(utterance, &outcome);
        Ok(outcome)
    }

    async fn execute(
        &self,
        utterance: &str,
        context: &ConversationContext,
    ) -> Result<PipelineOutcome, LookupError> {
        let translation = self
            .resolver
            .resolve(utterance, context.prior_query.as_ref())
            .await;
        info!(
            classification = ?translation.classification,
            source = ?translation.source,
            locations = ?translation.query.locations,
            ranks = ?translation.query.ranks,
            skills = ?translation.query.skills,
            "Resolved query"
        );

        let result = match self.matcher.match_query(&translation.query).await? {
            MatchOutcome::Broadened(notice) => MatchResult::Broadened { notice },
            MatchOutcome::Matches(employees) => MatchResult::Employees {
                employees: self.attach_availability(&translation.query, employees).await?,
            },
        };

        Ok(PipelineOutcome {
            query: translation.query,
            classification: translation.classification,
            source: translation.source,
            notes: translation.notes,
            result,
            from_cache: false,
        })
    }

    async fn attach_availability(
        &self,
        query: &StructuredQuery,
        employees: Vec<Employee>,
    ) -> Result<Vec<MatchedEmployee>, LookupError> {
        if employees.is_empty() || !query.has_availability_constraints() {
            return Ok(employees
                .into_iter()
                .map(|employee| MatchedEmployee {
                    employee,
                    availability: Vec::new(),
                })
                .collect());
        }

        let availability = self.availability.resolve(&employees, &query.weeks).await?;
        let kept = AvailabilityResolver::filter(
            employees,
            &availability,
            &query.availability_status,
            query.min_hours,
        );
        debug!(kept = kept.len(), "Availability filter applied");

        Ok(kept
            .into_iter()
            .map(|employee| {
                let weeks = availability
                    .get(&employee.employee_number)
                    .cloned()
                    .unwrap_or_default();
                MatchedEmployee {
                    employee,
                    availability: weeks,
                }
            })
            .collect())
    }
}
