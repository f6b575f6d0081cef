//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use resgenie_core::error::LookupError;
use resgenie_core::store::DEFAULT_ANY_OF_LIMIT;
use resgenie_core::{AvailabilityWeek, DocumentStore, Employee, EmployeeFilter};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::directory::{Directory, DirectoryDocument};

/// An in-memory employee directory. Query results follow insertion order.
pub struct InMemoryStore {
    directory: Arc<RwLock<Directory>>,
    any_of_limit: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(RwLock::new(Directory::default())),
            any_of_limit: DEFAULT_ANY_OF_LIMIT,
        }
    }

    /// Seed a store from a directory document.
    pub fn from_document(document: DirectoryDocument) -> Self {
        let mut directory = Directory::default();
        for employee in document.employees {
            directory.push_employee(employee);
        }
        for (number, weeks) in document.availability {
            for week in weeks {
                directory.push_week(&number, week);
            }
        }
        Self {
            directory: Arc::new(RwLock::new(directory)),
            any_of_limit: DEFAULT_ANY_OF_LIMIT,
        }
    }

    /// Override the any-of ceiling this store enforces.
    pub fn with_any_of_limit(mut self, limit: usize) -> Self {
        self.any_of_limit = limit;
        self
    }

    /// Add an employee, returning its document id.
    pub async fn insert_employee(&self, employee: Employee) -> String {
        self.directory.write().await.push_employee(employee)
    }

    /// Add (or replace) one week record for an employee.
    pub async fn insert_week(&self, employee_number: &str, week: AvailabilityWeek) {
        self.directory.write().await.push_week(employee_number, week);
    }

    pub async fn count(&self) -> usize {
        self.directory.read().await.employee_count()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn any_of_limit(&self) -> usize {
        self.any_of_limit
    }

    async fn query_employees(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, LookupError> {
        self.directory.read().await.query(filter, self.any_of_limit)
    }

    async fn availability(
        &self,
        employee_number: &str,
        weeks: &BTreeSet<u8>,
    ) -> Result<Vec<AvailabilityWeek>, LookupError> {
        Ok(self.directory.read().await.availability(employee_number, weeks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resgenie_core::{FieldFilter, WeekStatus};

    fn employee(number: &str, name: &str, location: &str, skills: &[&str]) -> Employee {
        Employee {
            id: String::new(),
            employee_number: number.into(),
            name: name.into(),
            location: location.into(),
            rank: "Senior Consultant".into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn insert_and_query_in_order() {
        let store = InMemoryStore::new();
        store.insert_employee(employee("EMP002", "Liam", "London", &["Data Engineer"])).await;
        store.insert_employee(employee("EMP001", "Ava", "London", &["Scrum Master"])).await;
        store.insert_employee(employee("EMP003", "Nora", "Oslo", &["Data Engineer"])).await;
        assert_eq!(store.count().await, 3);

        let filter = EmployeeFilter::all().with(FieldFilter::LocationIn(vec!["London".into()]));
        let names: Vec<String> = store
            .query_employees(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Liam", "Ava"]);
    }

    #[tokio::test]
    async fn skill_contains_any() {
        let store = InMemoryStore::new();
        store.insert_employee(employee("EMP001", "Ava", "London", &["Scrum Master"])).await;
        store.insert_employee(employee("EMP002", "Liam", "Bristol", &["Agile Coach"])).await;

        let filter = EmployeeFilter::all().with(FieldFilter::SkillContainsAny(vec![
            "Agile Coach".into(),
            "Cloud Engineer".into(),
        ]));
        let found = store.query_employees(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].employee_number, "EMP002");
    }

    #[tokio::test]
    async fn custom_any_of_limit_is_enforced() {
        let store = InMemoryStore::new().with_any_of_limit(1);
        assert_eq!(store.any_of_limit(), 1);

        let filter = EmployeeFilter::all()
            .with(FieldFilter::LocationIn(vec!["London".into(), "Oslo".into()]));
        assert!(store.query_employees(&filter).await.is_err());
    }

    #[tokio::test]
    async fn availability_batch_keys_by_number() {
        let store = InMemoryStore::new();
        for (week_number, status) in [(1, WeekStatus::Available), (2, WeekStatus::Unavailable)] {
            store
                .insert_week(
                    "EMP001",
                    AvailabilityWeek {
                        employee_number: String::new(),
                        week_number,
                        status,
                        hours: 40,
                        notes: None,
                    },
                )
                .await;
        }

        let batch = store
            .availability_batch(&["EMP001".into(), "EMP002".into()], &[2].into())
            .await
            .unwrap();
        assert_eq!(batch["EMP001"].len(), 1);
        assert_eq!(batch["EMP001"][0].status, WeekStatus::Unavailable);
        assert!(batch["EMP002"].is_empty());
    }

    #[tokio::test]
    async fn from_document_seeds_both_collections() {
        let document: DirectoryDocument = serde_json::from_str(
            r#"{
                "employees": [
                    {"employee_number": "EMP001", "name": "Ingrid", "location": "Oslo",
                     "rank": {"official_name": "Partner"}, "skills": ["Agile Coach"]}
                ],
                "availability": {
                    "EMP001": [{"week_number": 3, "status": "Available", "hours": 40}]
                }
            }"#,
        )
        .unwrap();

        let store = InMemoryStore::from_document(document);
        let everyone = store.query_employees(&EmployeeFilter::all()).await.unwrap();
        assert_eq!(everyone[0].rank, "Partner");
        assert!(!everyone[0].id.is_empty());

        let weeks = store.availability("EMP001", &BTreeSet::new()).await.unwrap();
        assert_eq!(weeks[0].employee_number, "EMP001");
    }
}
