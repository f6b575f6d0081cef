//! Weekly availability lookup and filtering.

use resgenie_core::error::LookupError;
use resgenie_core::{
    AvailabilityStatus, AvailabilityWeek, DocumentStore, Employee, MissingWeekPolicy, WeekStatus,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

pub struct AvailabilityResolver {
    store: Arc<dyn DocumentStore>,
    missing_weeks: MissingWeekPolicy,
}

impl AvailabilityResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            missing_weeks: MissingWeekPolicy::default(),
        }
    }

    pub fn with_missing_weeks(mut self, policy: MissingWeekPolicy) -> Self {
        self.missing_weeks = policy;
        self
    }

    /// Fetch availability for `employees` in one batch, keyed by employee
    /// number and sorted by week.
    ///
    /// Every requested week is present in the result; weeks the store has no
    /// record for are filled per the missing-week policy. An empty `weeks`
    /// returns whatever the store holds.
    pub async fn resolve(
        &self,
        employees: &[Employee],
        weeks: &BTreeSet<u8>,
    ) -> Result<HashMap<String, Vec<AvailabilityWeek>>, LookupError> {
        let mut numbers: Vec<String> = Vec::with_capacity(employees.len());
        for employee in employees {
            if !numbers.contains(&employee.employee_number) {
                numbers.push(employee.employee_number.clone());
            }
        }

        let mut batch = self.store.availability_batch(&numbers, weeks).await?;
        debug!(employees = numbers.len(), weeks = ?weeks, "Fetched availability batch");

        let mut resolved = HashMap::with_capacity(numbers.len());
        for number in numbers {
            let mut records = batch.remove(&number).unwrap_or_default();
            if !weeks.is_empty() {
                records.retain(|r| weeks.contains(&r.week_number));
                for &week in weeks {
                    if !records.iter().any(|r| r.week_number == week) {
                        records.push(AvailabilityWeek::missing(&number, week, self.missing_weeks));
                    }
                }
            }
            records.sort_by_key(|r| r.week_number);
            resolved.insert(number, records);
        }
        Ok(resolved)
    }

    /// Keep employees whose availability satisfies the requested statuses
    /// and hours, preserving input order.
    pub fn filter(
        employees: Vec<Employee>,
        availability: &HashMap<String, Vec<AvailabilityWeek>>,
        statuses: &BTreeSet<AvailabilityStatus>,
        min_hours: Option<u32>,
    ) -> Vec<Employee> {
        employees
            .into_iter()
            .filter(|employee| {
                let weeks = availability
                    .get(&employee.employee_number)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                satisfies_status(weeks, statuses) && satisfies_hours(weeks, min_hours)
            })
            .collect()
    }
}

/// Whether a stored week status answers a request for `requested`.
///
/// Asking for available also accepts partially available weeks.
pub fn status_matches(status: WeekStatus, requested: &BTreeSet<AvailabilityStatus>) -> bool {
    match status {
        WeekStatus::Available => requested.contains(&AvailabilityStatus::Available),
        WeekStatus::PartiallyAvailable => {
            requested.contains(&AvailabilityStatus::Partial)
                || requested.contains(&AvailabilityStatus::Available)
        }
        WeekStatus::Unavailable => requested.contains(&AvailabilityStatus::Unavailable),
        WeekStatus::Unknown => false,
    }
}

fn satisfies_status(weeks: &[AvailabilityWeek], statuses: &BTreeSet<AvailabilityStatus>) -> bool {
    statuses.is_empty() || weeks.iter().any(|w| status_matches(w.status, statuses))
}

fn satisfies_hours(weeks: &[AvailabilityWeek], min_hours: Option<u32>) -> bool {
    let Some(min) = min_hours else {
        return true;
    };
    // No data at all cannot prove the threshold.
    !weeks.is_empty()
        && weeks
            .iter()
            .all(|w| w.status != WeekStatus::Unknown && w.hours >= min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use resgenie_store::InMemoryStore;

    fn employee(number: &str) -> Employee {
        Employee {
            id: String::new(),
            employee_number: number.into(),
            name: format!("Person {number}"),
            location: "London".into(),
            rank: "Consultant".into(),
            skills: BTreeSet::new(),
        }
    }

    fn week(number: &str, week_number: u8, status: WeekStatus, hours: u32) -> AvailabilityWeek {
        AvailabilityWeek {
            employee_number: number.into(),
            week_number,
            status,
            hours,
            notes: None,
        }
    }

    async fn store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        for number in ["EMP001", "EMP002", "EMP003"] {
            store.insert_employee(employee(number)).await;
        }
        store.insert_week("EMP001", week("EMP001", 1, WeekStatus::Available, 40)).await;
        store.insert_week("EMP001", week("EMP001", 3, WeekStatus::PartiallyAvailable, 20)).await;
        store.insert_week("EMP002", week("EMP002", 1, WeekStatus::Unavailable, 0)).await;
        store.insert_week("EMP002", week("EMP002", 3, WeekStatus::Available, 40)).await;
        Arc::new(store)
    }

    fn set(statuses: &[AvailabilityStatus]) -> BTreeSet<AvailabilityStatus> {
        statuses.iter().copied().collect()
    }

    #[tokio::test]
    async fn missing_weeks_default_to_unknown() {
        let resolver = AvailabilityResolver::new(store().await);
        let employees = vec![employee("EMP001"), employee("EMP003")];
        let weeks: BTreeSet<u8> = [1, 2].into();

        let resolved = resolver.resolve(&employees, &weeks).await.unwrap();

        let emp1: Vec<_> = resolved["EMP001"].iter().map(|w| (w.week_number, w.status)).collect();
        assert_eq!(emp1, vec![(1, WeekStatus::Available), (2, WeekStatus::Unknown)]);
        assert!(resolved["EMP003"].iter().all(|w| w.status == WeekStatus::Unknown));
        assert_eq!(resolved["EMP003"].len(), 2);
    }

    #[tokio::test]
    async fn explicit_policy_marks_missing_weeks_unavailable() {
        let resolver = AvailabilityResolver::new(store().await)
            .with_missing_weeks(MissingWeekPolicy::TreatAsUnavailable);
        let resolved = resolver
            .resolve(&[employee("EMP003")], &[4].into())
            .await
            .unwrap();

        assert_eq!(resolved["EMP003"][0].status, WeekStatus::Unavailable);
    }

    #[tokio::test]
    async fn no_weeks_returns_everything_stored() {
        let resolver = AvailabilityResolver::new(store().await);
        let resolved = resolver
            .resolve(&[employee("EMP002")], &BTreeSet::new())
            .await
            .unwrap();

        let weeks: Vec<u8> = resolved["EMP002"].iter().map(|w| w.week_number).collect();
        assert_eq!(weeks, vec![1, 3]);
    }

    #[test]
    fn available_accepts_partial() {
        let available = set(&[AvailabilityStatus::Available]);
        assert!(status_matches(WeekStatus::Available, &available));
        assert!(status_matches(WeekStatus::PartiallyAvailable, &available));
        assert!(!status_matches(WeekStatus::Unavailable, &available));
        assert!(!status_matches(WeekStatus::Unknown, &available));

        let partial = set(&[AvailabilityStatus::Partial]);
        assert!(!status_matches(WeekStatus::Available, &partial));
        assert!(status_matches(WeekStatus::PartiallyAvailable, &partial));
    }

    #[tokio::test]
    async fn filter_uses_any_week_for_status() {
        let resolver = AvailabilityResolver::new(store().await);
        let employees = vec![employee("EMP001"), employee("EMP002"), employee("EMP003")];
        let weeks: BTreeSet<u8> = [1, 3].into();
        let availability = resolver.resolve(&employees, &weeks).await.unwrap();

        let kept = AvailabilityResolver::filter(
            employees,
            &availability,
            &set(&[AvailabilityStatus::Unavailable]),
            None,
        );
        let numbers: Vec<_> = kept.iter().map(|e| e.employee_number.as_str()).collect();
        assert_eq!(numbers, vec!["EMP002"]);
    }

    #[tokio::test]
    async fn min_hours_checks_every_week() {
        let resolver = AvailabilityResolver::new(store().await);
        let employees = vec![employee("EMP001"), employee("EMP002"), employee("EMP003")];
        let availability = resolver.resolve(&employees, &[1, 3].into()).await.unwrap();

        let thirty =
            AvailabilityResolver::filter(employees.clone(), &availability, &BTreeSet::new(), Some(30));
        assert!(thirty.is_empty());

        let availability = resolver.resolve(&employees, &[1].into()).await.unwrap();
        let kept = AvailabilityResolver::filter(employees, &availability, &BTreeSet::new(), Some(30));
        let numbers: Vec<_> = kept.iter().map(|e| e.employee_number.as_str()).collect();
        assert_eq!(numbers, vec!["EMP001"]);
    }

    #[test]
    fn unknown_week_never_meets_hours() {
        let weeks = vec![week("EMP009", 1, WeekStatus::Unknown, 40)];
        assert!(!satisfies_hours(&weeks, Some(10)));
        assert!(satisfies_hours(&weeks, None));
        assert!(!satisfies_hours(&[], Some(10)));
    }
}
