use resgenie_core::error::LookupError;
use resgenie_core::{AvailabilityWeek, Employee, EmployeeFilter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

/// On-disk shape of a directory: employees plus their week records keyed by
/// employee number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryDocument {
    #[serde(default)]
    pub employees: Vec<Employee>,

    #[serde(default)]
    pub availability: HashMap<String, Vec<AvailabilityWeek>>,
}

/// Loaded directory state shared by both adapters.
#[derive(Debug, Default)]
pub(crate) struct Directory {
    employees: Vec<Employee>,
    /// One record per (employee, week); a later insert replaces the earlier.
    weeks: HashMap<String, BTreeMap<u8, AvailabilityWeek>>,
}

impl Directory {
    pub(crate) fn push_employee(&mut self, mut employee: Employee) -> String {
        if employee.id.is_empty() {
            employee.id = Uuid::new_v4().to_string();
        }
        let id = employee.id.clone();
        self.employees.push(employee);
        id
    }

    pub(crate) fn push_week(&mut self, employee_number: &str, mut week: AvailabilityWeek) {
        week.employee_number = employee_number.to_string();
        self.weeks
            .entry(employee_number.to_string())
            .or_default()
            .insert(week.week_number, week);
    }

    pub(crate) fn employee_count(&self) -> usize {
        self.employees.len()
    }

    /// Evaluate a filter the way a document store would: reject any-of
    /// predicates over the ceiling, then scan in insertion order.
    pub(crate) fn query(
        &self,
        filter: &EmployeeFilter,
        any_of_limit: usize,
    ) -> Result<Vec<Employee>, LookupError> {
        if let Some(p) = filter.predicates.iter().find(|p| p.cardinality() > any_of_limit) {
            return Err(LookupError::QueryFailed(format!(
                "any-of predicate carries {} values, limit is {any_of_limit}",
                p.cardinality()
            )));
        }

        Ok(self
            .employees
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    pub(crate) fn availability(&self, employee_number: &str, weeks: &BTreeSet<u8>) -> Vec<AvailabilityWeek> {
        let Some(records) = self.weeks.get(employee_number) else {
            return Vec::new();
        };

        records
            .values()
            .filter(|w| weeks.is_empty() || weeks.contains(&w.week_number))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resgenie_core::{FieldFilter, WeekStatus};

    fn employee(number: &str, location: &str) -> Employee {
        Employee {
            id: String::new(),
            employee_number: number.into(),
            name: format!("Employee {number}"),
            location: location.into(),
            rank: "Consultant".into(),
            skills: BTreeSet::new(),
        }
    }

    fn week(week_number: u8, status: WeekStatus) -> AvailabilityWeek {
        AvailabilityWeek {
            employee_number: String::new(),
            week_number,
            status,
            hours: 40,
            notes: None,
        }
    }

    #[test]
    fn assigns_ids_to_anonymous_documents() {
        let mut dir = Directory::default();
        let id = dir.push_employee(employee("EMP001", "Oslo"));
        assert!(!id.is_empty());
        assert_eq!(dir.employee_count(), 1);
    }

    #[test]
    fn rejects_oversized_any_of() {
        let mut dir = Directory::default();
        dir.push_employee(employee("EMP001", "Oslo"));
        let filter = EmployeeFilter::all().with(FieldFilter::LocationIn(vec![
            "Oslo".into(),
            "Stockholm".into(),
            "Copenhagen".into(),
        ]));

        assert!(matches!(dir.query(&filter, 2), Err(LookupError::QueryFailed(_))));
        assert_eq!(dir.query(&filter, 3).unwrap().len(), 1);
    }

    #[test]
    fn later_week_record_replaces_earlier() {
        let mut dir = Directory::default();
        dir.push_week("EMP001", week(2, WeekStatus::Available));
        dir.push_week("EMP001", week(2, WeekStatus::Unavailable));
        dir.push_week("EMP001", week(1, WeekStatus::Available));

        let all = dir.availability("EMP001", &BTreeSet::new());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].week_number, 1);
        assert_eq!(all[1].status, WeekStatus::Unavailable);
        assert_eq!(all[1].employee_number, "EMP001");

        let only_two = dir.availability("EMP001", &[2].into());
        assert_eq!(only_two.len(), 1);
        assert!(dir.availability("EMP404", &BTreeSet::new()).is_empty());
    }
}
