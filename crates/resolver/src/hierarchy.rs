//! Rank hierarchy resolution: turn "above X", "between X and Y" and plain
//! rank lists into concrete rank names.
//!
//! Co-equal ranks share an ordinal and are never ordered against each
//! other: neither is "above" the other.

use crate::vocabulary::{RANK_LEVELS, all_ranks, canonical_rank, normalize_text, rank_level};

/// A rank constraint as phrased by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankRelation {
    Exact(String),
    Above(String),
    Below(String),
    Between(String, String),
    List(Vec<String>),
}

/// Matching ranks (highest first) plus a note on how they were derived or
/// what was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankResolution {
    pub ranks: Vec<&'static str>,
    pub explanation: Option<String>,
}

impl RankResolution {
    fn unrecognized(anchor: &str) -> Self {
        Self {
            ranks: Vec::new(),
            explanation: Some(format!("unrecognized rank '{anchor}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RankHierarchyResolver {
    between_includes_coequals: bool,
}

impl RankHierarchyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include co-equals of the boundary ranks in BETWEEN results.
    pub fn with_between_coequals(mut self, include: bool) -> Self {
        self.between_includes_coequals = include;
        self
    }

    pub fn resolve_relation(&self, relation: &RankRelation) -> RankResolution {
        match relation {
            RankRelation::Exact(anchor) => match canonical_rank(anchor) {
                Some(rank) => RankResolution {
                    ranks: vec![rank],
                    explanation: None,
                },
                None => RankResolution::unrecognized(anchor),
            },
            RankRelation::Above(anchor) => {
                let Some((rank, level)) = anchor_level(anchor) else {
                    return RankResolution::unrecognized(anchor);
                };
                described(ranks_where(|l| l < level), format!("above {rank}"))
            }
            RankRelation::Below(anchor) => {
                let Some((rank, level)) = anchor_level(anchor) else {
                    return RankResolution::unrecognized(anchor);
                };
                described(ranks_where(|l| l > level), format!("below {rank}"))
            }
            RankRelation::Between(x, y) => {
                let (Some((rx, lx)), Some((ry, ly))) = (anchor_level(x), anchor_level(y)) else {
                    let bad = if anchor_level(x).is_none() { x } else { y };
                    return RankResolution::unrecognized(bad);
                };
                let (lo, hi) = (lx.min(ly), lx.max(ly));
                let include_coequals = self.between_includes_coequals;

                let ranks = all_ranks()
                    .filter(|rank| {
                        let Some(l) = rank_level(rank) else { return false };
                        let strictly_between = lo < l && l < hi;
                        let boundary_coequal = include_coequals
                            && (l == lo || l == hi)
                            && *rank != rx
                            && *rank != ry;
                        strictly_between || boundary_coequal
                    })
                    .collect();
                described(ranks, format!("between {rx} and {ry}"))
            }
            RankRelation::List(tokens) => {
                let mut ranks: Vec<&'static str> = Vec::new();
                let mut dropped: Vec<&str> = Vec::new();
                for token in tokens {
                    match canonical_rank(token) {
                        Some(rank) if !ranks.contains(&rank) => ranks.push(rank),
                        Some(_) => {}
                        None => dropped.push(token),
                    }
                }
                ranks.sort_by_key(|rank| rank_level(rank));
                RankResolution {
                    ranks,
                    explanation: (!dropped.is_empty())
                        .then(|| format!("dropped unrecognized ranks: {}", dropped.join(", "))),
                }
            }
        }
    }
}

fn anchor_level(anchor: &str) -> Option<(&'static str, usize)> {
    let rank = canonical_rank(anchor)?;
    rank_level(rank).map(|level| (rank, level))
}

fn ranks_where(keep: impl Fn(usize) -> bool) -> Vec<&'static str> {
    RANK_LEVELS
        .iter()
        .enumerate()
        .filter(|(level, _)| keep(*level))
        .flat_map(|(_, ranks)| ranks.iter().copied())
        .collect()
}

fn described(ranks: Vec<&'static str>, relation: String) -> RankResolution {
    let explanation = if ranks.is_empty() {
        format!("no ranks {relation}")
    } else {
        format!("{relation}: {}", ranks.join(", "))
    };
    RankResolution {
        ranks,
        explanation: Some(explanation),
    }
}

const ABOVE_MARKERS: &[&str] = &["more senior than", "higher than", "senior to", "above"];
const BELOW_MARKERS: &[&str] = &["more junior than", "lower than", "junior to", "below"];
const SENIOR_GROUPS: &[&str] = &[
    "senior staff",
    "senior people",
    "senior employees",
    "senior resources",
    "senior folks",
];

/// The rank that "senior staff" starts from.
const SENIOR_FLOOR: &str = "Management Consultant";

/// Detect a relational rank phrase in an utterance.
///
/// Returns `None` unless the phrase's anchor is a recognizable rank, so
/// "above 20 hours" is not mistaken for a rank constraint. "X and above" /
/// "X and below" include X itself and come back as a `List`.
pub fn parse_relation(text: &str) -> Option<RankRelation> {
    let normalized = normalize_text(text);
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();

    if let Some(after) = find_seq(&words, &["between"]) {
        if let Some(and) = words[after..].iter().position(|w| *w == "and") {
            let x = rank_prefix(&words[after..after + and]);
            let y = rank_prefix(&words[after + and + 1..]);
            if let (Some(x), Some(y)) = (x, y) {
                return Some(RankRelation::Between(x.into(), y.into()));
            }
        }
    }

    for marker in ABOVE_MARKERS {
        if let Some(after) = find_marker(&words, marker) {
            if let Some(rank) = rank_prefix(&words[after..]) {
                return Some(RankRelation::Above(rank.into()));
            }
        }
    }

    for marker in BELOW_MARKERS {
        if let Some(after) = find_marker(&words, marker) {
            if let Some(rank) = rank_prefix(&words[after..]) {
                return Some(RankRelation::Below(rank.into()));
            }
        }
    }

    for (i, window) in words.windows(3).enumerate() {
        if window[1] == "and" || window[1] == "or" {
            let inclusive_above = matches!(window[2], "above" | "up" | "higher");
            let inclusive_below = matches!(window[2], "below" | "lower");
            if !(inclusive_above || inclusive_below) {
                continue;
            }
            // Rank names span at most two words before the conjunction.
            let start = i.saturating_sub(1);
            let anchor = rank_suffix(&words[start..=i]);
            if let Some(rank) = anchor {
                return Some(inclusive_list(rank, inclusive_above));
            }
        }
    }

    if SENIOR_GROUPS.iter().any(|group| find_marker(&words, group).is_some()) {
        return Some(inclusive_list(SENIOR_FLOOR, true));
    }

    None
}

fn inclusive_list(anchor: &'static str, upwards: bool) -> RankRelation {
    let level = rank_level(anchor).unwrap_or_default();
    let ranks = ranks_where(|l| if upwards { l <= level } else { l >= level });
    RankRelation::List(ranks.into_iter().map(String::from).collect())
}

fn find_marker(words: &[&str], marker: &str) -> Option<usize> {
    let seq: Vec<&str> = marker.split(' ').collect();
    find_seq(words, &seq)
}

/// Index just past the first occurrence of `seq` in `words`.
fn find_seq(words: &[&str], seq: &[&str]) -> Option<usize> {
    if seq.is_empty() || seq.len() > words.len() {
        return None;
    }
    words
        .windows(seq.len())
        .position(|w| w == seq)
        .map(|start| start + seq.len())
}

/// Longest rank name (up to three words) at the start of `words`, after
/// an optional article.
fn rank_prefix(words: &[&str]) -> Option<&'static str> {
    let words = match words.first() {
        Some(&("a" | "an" | "the")) => &words[1..],
        _ => words,
    };
    (1..=words.len().min(3))
        .rev()
        .find_map(|n| canonical_rank(&words[..n].join(" ")))
}

/// Longest rank name ending at the last of `words`.
fn rank_suffix(words: &[&str]) -> Option<&'static str> {
    (0..words.len()).find_map(|start| canonical_rank(&words[start..].join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn above(rank: &str) -> Vec<&'static str> {
        RankHierarchyResolver::new()
            .resolve_relation(&RankRelation::Above(rank.into()))
            .ranks
    }

    fn below(rank: &str) -> Vec<&'static str> {
        RankHierarchyResolver::new()
            .resolve_relation(&RankRelation::Below(rank.into()))
            .ranks
    }

    #[test]
    fn above_is_strict_and_skips_coequals() {
        assert_eq!(above("Management Consultant"), vec!["Partner", "Associate Partner", "Consulting Director"]);
        assert_eq!(above("Consulting Director"), vec!["Partner"]);
        assert!(above("Partner").is_empty());
    }

    #[test]
    fn below_is_strict() {
        assert_eq!(
            below("Principal Consultant"),
            vec!["Senior Consultant", "Consultant", "Consultant Analyst", "Analyst"]
        );
        assert!(below("Analyst").is_empty());
    }

    #[test]
    fn above_never_contains_self_lower_or_lowest() {
        let lowest = "Analyst";
        for rank in all_ranks() {
            let result = above(rank);
            let level = rank_level(rank).unwrap();
            assert!(!result.contains(&rank), "ABOVE({rank}) contains itself");
            assert!(!result.contains(&lowest), "ABOVE({rank}) contains the lowest rank");
            assert!(result.iter().all(|r| rank_level(r).unwrap() < level));
        }
    }

    #[test]
    fn above_below_and_level_partition_all_ranks() {
        let everything: BTreeSet<&str> = all_ranks().collect();
        for rank in all_ranks() {
            let level = rank_level(rank).unwrap();
            let a: BTreeSet<&str> = above(rank).into_iter().collect();
            let b: BTreeSet<&str> = below(rank).into_iter().collect();
            let same: BTreeSet<&str> = RANK_LEVELS[level].iter().copied().collect();

            assert!(a.is_disjoint(&b));
            assert!(a.is_disjoint(&same));
            assert!(b.is_disjoint(&same));

            let union: BTreeSet<&str> = a.union(&b).chain(same.iter()).copied().collect();
            assert_eq!(union, everything, "partition broken at {rank}");
        }
    }

    #[test]
    fn between_orders_anchors_and_honors_coequal_policy() {
        let resolver = RankHierarchyResolver::new();
        let relation = RankRelation::Between("Senior Consultant".into(), "Associate Partner".into());
        assert_eq!(
            resolver.resolve_relation(&relation).ranks,
            vec!["Management Consultant", "Principal Consultant"]
        );

        let inclusive = resolver.with_between_coequals(true).resolve_relation(&relation);
        assert_eq!(
            inclusive.ranks,
            vec!["Consulting Director", "Management Consultant", "Principal Consultant"]
        );
    }

    #[test]
    fn exact_and_list() {
        let resolver = RankHierarchyResolver::new();
        assert_eq!(
            resolver.resolve_relation(&RankRelation::Exact("partners".into())).ranks,
            vec!["Partner"]
        );

        let list = resolver.resolve_relation(&RankRelation::List(vec![
            "consultant".into(),
            "Wizard".into(),
            "partner".into(),
        ]));
        assert_eq!(list.ranks, vec!["Partner", "Consultant"]);
        assert_eq!(list.explanation.as_deref(), Some("dropped unrecognized ranks: Wizard"));
    }

    #[test]
    fn unknown_anchor_is_empty_with_explanation() {
        let resolution = RankHierarchyResolver::new().resolve_relation(&RankRelation::Above("Wizard".into()));
        assert!(resolution.ranks.is_empty());
        assert!(resolution.explanation.unwrap().contains("Wizard"));
    }

    #[test]
    fn parses_relational_phrases() {
        assert_eq!(
            parse_relation("people above consultant analyst in London"),
            Some(RankRelation::Above("Consultant Analyst".into()))
        );
        assert_eq!(
            parse_relation("anyone more junior than a principal?"),
            Some(RankRelation::Below("Principal Consultant".into()))
        );
        assert_eq!(
            parse_relation("who is senior to the consultants"),
            Some(RankRelation::Above("Consultant".into()))
        );
        assert_eq!(
            parse_relation("between senior consultant and partner"),
            Some(RankRelation::Between("Senior Consultant".into(), "Partner".into()))
        );
        assert_eq!(parse_relation("free above 20 hours"), None);
        assert_eq!(parse_relation("frontend developers in London"), None);
    }

    #[test]
    fn inclusive_and_senior_group_phrases() {
        let Some(RankRelation::List(ranks)) = parse_relation("senior staff in the UK") else {
            panic!("senior staff should resolve to a list");
        };
        assert_eq!(
            ranks,
            vec!["Partner", "Associate Partner", "Consulting Director", "Management Consultant"]
        );

        let Some(RankRelation::List(ranks)) = parse_relation("consultant analyst and below") else {
            panic!("'and below' should resolve to a list");
        };
        assert_eq!(ranks, vec!["Consultant Analyst", "Analyst"]);
    }
}
