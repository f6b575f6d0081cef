//! The canonical filter produced by query resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Availability buckets a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    Available,
    Partial,
    Unavailable,
}

impl AvailabilityStatus {
    /// Parse casual status wording ("free", "partially available", "booked").
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "available" | "free" | "open" => Some(Self::Available),
            "partial" | "partially available" | "partly available" | "part time" => {
                Some(Self::Partial)
            }
            "unavailable" | "not available" | "busy" | "booked" => Some(Self::Unavailable),
            _ => None,
        }
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Partial => write!(f, "partially available"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Canonical staffing filter.
///
/// An empty collection means "no constraint", never "match nothing". After
/// resolution every value is a vocabulary-valid name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredQuery {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub locations: BTreeSet<String>,

    /// Concrete rank names, already hierarchy-expanded.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub ranks: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub skills: BTreeSet<String>,

    /// Week numbers in 1..=52.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub weeks: BTreeSet<u8>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub availability_status: BTreeSet<AvailabilityStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_hours: Option<u32>,
}

impl StructuredQuery {
    /// True when no field constrains anything.
    pub fn is_unconstrained(&self) -> bool {
        self.locations.is_empty()
            && self.ranks.is_empty()
            && self.skills.is_empty()
            && !self.has_availability_constraints()
    }

    /// Whether the availability stage has anything to do.
    pub fn has_availability_constraints(&self) -> bool {
        !self.weeks.is_empty() || !self.availability_status.is_empty() || self.min_hours.is_some()
    }

    /// A location plus a rank or skill: enough to stand alone as a new search.
    pub fn is_complete_search(&self) -> bool {
        !self.locations.is_empty() && (!self.ranks.is_empty() || !self.skills.is_empty())
    }
}
