//! Employee directory documents and their week-keyed availability records.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// A read snapshot of one employee document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Store document id
    #[serde(default)]
    pub id: String,

    /// Stable external key used to join availability
    pub employee_number: String,

    pub name: String,

    pub location: String,

    /// Official rank name. Stores may nest it as `{"official_name": ...}`.
    #[serde(deserialize_with = "deserialize_rank")]
    pub rank: String,

    #[serde(default)]
    pub skills: BTreeSet<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RankField {
    Name(String),
    Nested { official_name: String },
}

fn deserialize_rank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match RankField::deserialize(deserializer)? {
        RankField::Name(name) => name,
        RankField::Nested { official_name } => official_name,
    })
}

impl Employee {
    /// Exact skill membership, the same comparison a store `contains` uses.
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }
}

/// Status of one (employee, week) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeekStatus {
    Available,
    PartiallyAvailable,
    Unavailable,
    /// No record exists for the week. Never synthesized as `Unavailable`
    /// unless the caller opted into that policy.
    Unknown,
}

impl From<String> for WeekStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "available" => Self::Available,
            "partially available" | "partial" => Self::PartiallyAvailable,
            "unavailable" | "not available" => Self::Unavailable,
            _ => Self::Unknown,
        }
    }
}

impl From<WeekStatus> for String {
    fn from(status: WeekStatus) -> Self {
        status.to_string()
    }
}

impl std::fmt::Display for WeekStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Available => "Available",
            Self::PartiallyAvailable => "Partially Available",
            Self::Unavailable => "Unavailable",
            Self::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// One logical availability record per (employee, week).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWeek {
    /// Stores keep weeks in a per-employee sub-collection, so documents may
    /// omit this; the store fills it in on read.
    #[serde(default)]
    pub employee_number: String,

    pub week_number: u8,

    pub status: WeekStatus,

    #[serde(default)]
    pub hours: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AvailabilityWeek {
    /// Placeholder for a requested week the store has no record of.
    pub fn missing(employee_number: &str, week_number: u8, policy: MissingWeekPolicy) -> Self {
        let status = match policy {
            MissingWeekPolicy::Unknown => WeekStatus::Unknown,
            MissingWeekPolicy::TreatAsUnavailable => WeekStatus::Unavailable,
        };
        Self {
            employee_number: employee_number.to_string(),
            week_number,
            status,
            hours: 0,
            notes: None,
        }
    }
}

/// How a requested week without a stored record is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingWeekPolicy {
    /// Report the week as `Unknown`.
    #[default]
    Unknown,
    /// Report the week as `Unavailable`. Must be chosen explicitly.
    #[serde(rename = "unavailable")]
    TreatAsUnavailable,
}
