//! Structured query → employee list, with store pushdown and the
//! top-rank fallback.

use resgenie_core::error::LookupError;
use resgenie_core::{DocumentStore, Employee, EmployeeFilter, FieldFilter, StructuredQuery};
use resgenie_resolver::vocabulary::TOP_RANK;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// How many broadened matches are named in a fallback notice.
const NOTICE_SAMPLES: usize = 3;

/// A single example match carried by a fallback notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleMatch {
    pub name: String,
    pub location: String,
}

/// Returned instead of an empty list when a top-rank search found nobody in
/// the requested locations but does exist elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackNotice {
    pub rank: String,
    pub requested_locations: Vec<String>,
    pub count: usize,
    /// Distinct locations of the broadened matches, in store order.
    pub locations: Vec<String>,
    pub samples: Vec<SampleMatch>,
}

impl FallbackNotice {
    fn from_matches(rank: &str, query: &StructuredQuery, matches: &[Employee]) -> Self {
        let mut locations: Vec<String> = Vec::new();
        for employee in matches {
            if !locations.contains(&employee.location) {
                locations.push(employee.location.clone());
            }
        }

        Self {
            rank: rank.to_string(),
            requested_locations: query.locations.iter().cloned().collect(),
            count: matches.len(),
            locations,
            samples: matches
                .iter()
                .take(NOTICE_SAMPLES)
                .map(|e| SampleMatch {
                    name: e.name.clone(),
                    location: e.location.clone(),
                })
                .collect(),
        }
    }

    pub fn message(&self) -> String {
        format!(
            "No {rank} found in {requested}. {count} {rank}(s) found in {found}.",
            rank = self.rank,
            requested = self.requested_locations.join(", "),
            count = self.count,
            found = self.locations.join(", "),
        )
    }
}

impl std::fmt::Display for FallbackNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matches(Vec<Employee>),
    Broadened(FallbackNotice),
}

/// Runs a `StructuredQuery` against a `DocumentStore`.
///
/// Whatever subset of the query is pushed to the store, every constraint is
/// re-checked client-side before results are returned.
pub struct ResourceMatcher {
    store: Arc<dyn DocumentStore>,
    any_of_limit: usize,
    fallback_broadening: bool,
}

impl ResourceMatcher {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let any_of_limit = store.any_of_limit().max(1);
        Self {
            store,
            any_of_limit,
            fallback_broadening: true,
        }
    }

    /// Lower the pushdown ceiling. It never rises above the store's own.
    pub fn with_any_of_limit(mut self, limit: usize) -> Self {
        self.any_of_limit = limit.clamp(1, self.store.any_of_limit().max(1));
        self
    }

    pub fn with_fallback_broadening(mut self, enabled: bool) -> Self {
        self.fallback_broadening = enabled;
        self
    }

    pub fn any_of_limit(&self) -> usize {
        self.any_of_limit
    }

    pub async fn match_query(&self, query: &StructuredQuery) -> Result<MatchOutcome, LookupError> {
        let matches = self.fetch(query, true).await?;
        if !matches.is_empty() {
            return Ok(MatchOutcome::Matches(matches));
        }

        let Some(rank) = self.broadening_rank(query) else {
            return Ok(MatchOutcome::Matches(matches));
        };

        let elsewhere = self.fetch(query, false).await?;
        if elsewhere.is_empty() {
            return Ok(MatchOutcome::Matches(elsewhere));
        }

        let notice = FallbackNotice::from_matches(rank, query, &elsewhere);
        info!(
            rank,
            requested = ?notice.requested_locations,
            count = notice.count,
            "Broadened top-rank search beyond requested locations"
        );
        Ok(MatchOutcome::Broadened(notice))
    }

    /// The top rank name when this query qualifies for broadening.
    fn broadening_rank<'q>(&self, query: &'q StructuredQuery) -> Option<&'q str> {
        if !self.fallback_broadening || query.locations.is_empty() || query.ranks.len() != 1 {
            return None;
        }
        query
            .ranks
            .iter()
            .next()
            .map(String::as_str)
            .filter(|rank| rank.eq_ignore_ascii_case(TOP_RANK))
    }

    async fn fetch(
        &self,
        query: &StructuredQuery,
        with_locations: bool,
    ) -> Result<Vec<Employee>, LookupError> {
        let filter = self.pushdown(query, with_locations);
        debug!(
            store = self.store.name(),
            predicates = filter.predicates.len(),
            with_locations,
            "Querying employee directory"
        );

        let mut employees = self.store.query_employees(&filter).await?;
        let fetched = employees.len();
        employees.retain(|e| verify(query, e, with_locations));
        debug!(fetched, kept = employees.len(), "Client-side verification done");
        Ok(employees)
    }

    fn pushdown(&self, query: &StructuredQuery, with_locations: bool) -> EmployeeFilter {
        let mut filter = EmployeeFilter::all();

        if with_locations && !query.locations.is_empty() {
            if query.locations.len() <= self.any_of_limit {
                filter = filter.with(FieldFilter::LocationIn(
                    query.locations.iter().cloned().collect(),
                ));
            } else {
                debug!(
                    locations = query.locations.len(),
                    limit = self.any_of_limit,
                    "Location list over any-of limit, filtering client-side"
                );
            }
        }

        let mut skills = query.skills.iter();
        match query.skills.len() {
            0 => {}
            1 => {
                if let Some(skill) = skills.next() {
                    filter = filter.with(FieldFilter::SkillContains(skill.clone()));
                }
            }
            _ => {
                filter = filter.with(FieldFilter::SkillContainsAny(
                    skills.take(self.any_of_limit).cloned().collect(),
                ));
            }
        }

        filter
    }
}

/// Re-check every constraint. Location and skills compare exactly, as the
/// store predicates do, so the outcome never depends on what was pushed down.
/// Rank is the one case-insensitive comparison.
fn verify(query: &StructuredQuery, employee: &Employee, with_locations: bool) -> bool {
    let location_ok = !with_locations
        || query.locations.is_empty()
        || query.locations.contains(&employee.location);

    let rank_ok = query.ranks.is_empty()
        || query
            .ranks
            .iter()
            .any(|r| r.eq_ignore_ascii_case(&employee.rank));

    let skills_ok = query.skills.iter().all(|s| employee.has_skill(s));

    location_ok && rank_ok && skills_ok
}
