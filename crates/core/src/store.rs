//! DocumentStore trait: the employee directory and its availability
//! sub-collections.
//!
//! The store offers a deliberately small query model: equality / any-of on
//! location and contains / contains-any on skills. Anything richer (rank
//! matching, all-of skills) is done client-side by the matcher.
//!
//! Implementations: in-memory (testing, ephemeral sessions), JSON file.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use crate::employee::{AvailabilityWeek, Employee};
use crate::error::LookupError;

/// Default cardinality ceiling for any-of predicates.
pub const DEFAULT_ANY_OF_LIMIT: usize = 10;

/// A single server-side predicate over the employee collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFilter {
    /// `location` equals one of the values.
    LocationIn(Vec<String>),
    /// `skills` array contains the value.
    SkillContains(String),
    /// `skills` array contains at least one of the values.
    SkillContainsAny(Vec<String>),
}

impl FieldFilter {
    /// Reference evaluation with document-store semantics: exact,
    /// case-sensitive comparisons.
    pub fn matches(&self, employee: &Employee) -> bool {
        match self {
            Self::LocationIn(locations) => locations.iter().any(|l| *l == employee.location),
            Self::SkillContains(skill) => employee.skills.contains(skill),
            Self::SkillContainsAny(skills) => skills.iter().any(|s| employee.skills.contains(s)),
        }
    }

    /// Number of values in an any-of predicate.
    pub fn cardinality(&self) -> usize {
        match self {
            Self::LocationIn(values) | Self::SkillContainsAny(values) => values.len(),
            Self::SkillContains(_) => 1,
        }
    }
}

/// A conjunction of predicates. No predicates selects the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeFilter {
    pub predicates: Vec<FieldFilter>,
}

impl EmployeeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: FieldFilter) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        self.predicates.iter().all(|p| p.matches(employee))
    }
}

/// The core DocumentStore trait.
///
/// There is no snapshot isolation between the employee query and the
/// availability reads; availability may reflect a slightly different moment.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The backend name (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// Maximum number of values an any-of predicate may carry.
    fn any_of_limit(&self) -> usize {
        DEFAULT_ANY_OF_LIMIT
    }

    /// Run a filtered query, returning documents in native iteration order.
    async fn query_employees(&self, filter: &EmployeeFilter) -> std::result::Result<Vec<Employee>, LookupError>;

    /// Stored week records for one employee. An empty `weeks` set returns
    /// every stored week.
    async fn availability(
        &self,
        employee_number: &str,
        weeks: &BTreeSet<u8>,
    ) -> std::result::Result<Vec<AvailabilityWeek>, LookupError>;

    /// Stored week records for many employees, keyed by employee number.
    ///
    /// Default implementation fans out one `availability` call per employee
    /// and re-keys the results; completion order does not matter.
    async fn availability_batch(
        &self,
        employee_numbers: &[String],
        weeks: &BTreeSet<u8>,
    ) -> std::result::Result<HashMap<String, Vec<AvailabilityWeek>>, LookupError> {
        let lookups = employee_numbers.iter().map(|number| async move {
            self.availability(number, weeks)
                .await
                .map(|records| (number.clone(), records))
        });

        let mut batch = HashMap::with_capacity(employee_numbers.len());
        for result in futures::future::join_all(lookups).await {
            let (number, records) = result?;
            batch.insert(number, records);
        }
        Ok(batch)
    }
}
