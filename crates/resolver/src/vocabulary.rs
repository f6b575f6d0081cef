//! Static reference data: regions, the rank hierarchy, and skill synonyms.
//!
//! Every lookup is case-insensitive and goes through `normalize_text`, so
//! "Front-End", "front end" and "FRONT END" all resolve the same way.

use std::cmp::Reverse;

/// Region name → member locations.
pub const REGIONS: &[(&str, &[&str])] = &[
    ("Nordics", &["Oslo", "Stockholm", "Copenhagen"]),
    ("UK", &["London", "Manchester", "Belfast", "Bristol"]),
    ("US", &["New York", "Chicago", "San Francisco"]),
];

/// Normalized alias → region name.
const REGION_ALIASES: &[(&str, &str)] = &[
    ("nordics", "Nordics"),
    ("nordic", "Nordics"),
    ("nordic countries", "Nordics"),
    ("scandinavia", "Nordics"),
    ("uk", "UK"),
    ("united kingdom", "UK"),
    ("britain", "UK"),
    ("great britain", "UK"),
    ("us", "US"),
    ("usa", "US"),
    ("united states", "US"),
    ("america", "US"),
];

/// Aliases too common as plain words to scan for in free text.
const PROSE_AMBIGUOUS: &[&str] = &["us"];

/// Rank levels, highest authority first. Ranks sharing a level are co-equal.
pub const RANK_LEVELS: &[&[&str]] = &[
    &["Partner"],
    &["Associate Partner", "Consulting Director"],
    &["Management Consultant"],
    &["Principal Consultant"],
    &["Senior Consultant"],
    &["Consultant"],
    &["Consultant Analyst"],
    &["Analyst"],
];

/// The rank that fallback broadening applies to.
pub const TOP_RANK: &str = "Partner";

/// Normalized alias → rank, beyond the canonical names and their plurals.
const RANK_ALIASES: &[(&str, &str)] = &[
    ("partnership", "Partner"),
    ("ap", "Associate Partner"),
    ("director", "Consulting Director"),
    ("principal", "Principal Consultant"),
    ("senior", "Senior Consultant"),
];

pub const CANONICAL_SKILLS: &[&str] = &[
    "Frontend Developer",
    "Backend Developer",
    "Full Stack Developer",
    "AWS Engineer",
    "Cloud Engineer",
    "DevOps Engineer",
    "Data Engineer",
    "Solution Architect",
    "Business Analyst",
    "Product Manager",
    "Project Manager",
    "Agile Coach",
    "Scrum Master",
];

/// Casual phrasing (normalized) → canonical skill.
const SKILL_SYNONYMS: &[(&str, &str)] = &[
    ("frontend", "Frontend Developer"),
    ("front end", "Frontend Developer"),
    ("frontend dev", "Frontend Developer"),
    ("front end developer", "Frontend Developer"),
    ("ui", "Frontend Developer"),
    ("backend", "Backend Developer"),
    ("back end", "Backend Developer"),
    ("backend dev", "Backend Developer"),
    ("back end developer", "Backend Developer"),
    ("fullstack", "Full Stack Developer"),
    ("full stack", "Full Stack Developer"),
    ("fullstack developer", "Full Stack Developer"),
    ("aws", "AWS Engineer"),
    ("cloud", "Cloud Engineer"),
    ("devops", "DevOps Engineer"),
    ("dev ops", "DevOps Engineer"),
    ("data", "Data Engineer"),
    ("data engineering", "Data Engineer"),
    ("architect", "Solution Architect"),
    ("solutions architect", "Solution Architect"),
    ("ba", "Business Analyst"),
    ("product", "Product Manager"),
    ("product management", "Product Manager"),
    ("project", "Project Manager"),
    ("project management", "Project Manager"),
    ("agile", "Agile Coach"),
    ("scrum", "Scrum Master"),
];

/// Synonym keys that may also match inside a longer token, e.g.
/// "react frontend engineer". Everything else must match whole.
const SUBSTRING_ALLOW_LIST: &[&str] = &[
    "full stack",
    "fullstack",
    "frontend",
    "front end",
    "backend",
    "back end",
    "devops",
    "scrum",
    "agile",
];

/// Lower-case, turn punctuation into spaces, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '+' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Candidate singular forms of a normalized token, itself first.
fn singulars(token: &str) -> impl Iterator<Item = &str> {
    let s = token.strip_suffix('s');
    let es = token.strip_suffix("es");
    std::iter::once(token).chain(s).chain(es)
}

// --- Locations ---

/// Member locations of a region, by name or alias.
pub fn region(name: &str) -> Option<&'static [&'static str]> {
    let key = normalize_text(name);
    let region_name = REGION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, region)| *region)?;
    REGIONS
        .iter()
        .find(|(name, _)| *name == region_name)
        .map(|(_, members)| *members)
}

/// Every location that belongs to some region.
pub fn known_locations() -> impl Iterator<Item = &'static str> {
    REGIONS.iter().flat_map(|(_, members)| members.iter().copied())
}

/// Canonical spelling of a known location.
pub fn canonical_location(token: &str) -> Option<&'static str> {
    let key = normalize_text(token);
    known_locations().find(|loc| normalize_text(loc) == key)
}

/// Region → members, known location → itself, anything else → empty.
///
/// Idempotent: expanding the output again yields the same locations.
pub fn expand_location(token: &str) -> Vec<&'static str> {
    if let Some(members) = region(token) {
        return members.to_vec();
    }
    canonical_location(token).into_iter().collect()
}

// --- Ranks ---

/// Ordinal of a canonical rank (0 = highest authority).
pub fn rank_level(rank: &str) -> Option<usize> {
    RANK_LEVELS
        .iter()
        .position(|level| level.iter().any(|r| r.eq_ignore_ascii_case(rank)))
}

/// All ranks, highest first. Co-equals appear in table order.
pub fn all_ranks() -> impl Iterator<Item = &'static str> {
    RANK_LEVELS.iter().flat_map(|level| level.iter().copied())
}

pub fn lowest_rank_level() -> usize {
    RANK_LEVELS.len() - 1
}

/// Resolve a rank token (plural, alias, any case) to its canonical name.
pub fn canonical_rank(token: &str) -> Option<&'static str> {
    let key = normalize_text(token);
    singulars(&key).find_map(|candidate| {
        all_ranks()
            .find(|rank| normalize_text(rank) == candidate)
            .or_else(|| {
                RANK_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == candidate)
                    .map(|(_, rank)| *rank)
            })
    })
}

// --- Skills ---

/// Resolve a skill token to its canonical name.
///
/// Exact canonical names and synonyms first (plurals allowed), then the
/// substring allow-list.
pub fn canonical_skill(token: &str) -> Option<&'static str> {
    let key = normalize_text(token);
    if key.is_empty() {
        return None;
    }

    let whole = singulars(&key).find_map(|candidate| {
        CANONICAL_SKILLS
            .iter()
            .find(|skill| normalize_text(skill) == candidate)
            .copied()
            .or_else(|| {
                SKILL_SYNONYMS
                    .iter()
                    .find(|(alias, _)| *alias == candidate)
                    .map(|(_, skill)| *skill)
            })
    });
    if whole.is_some() {
        return whole;
    }

    SUBSTRING_ALLOW_LIST
        .iter()
        .find(|needle| key.contains(**needle))
        .and_then(|needle| {
            SKILL_SYNONYMS
                .iter()
                .find(|(alias, _)| alias == needle)
                .map(|(_, skill)| *skill)
        })
}

// --- Free-text scanning ---

/// Finds vocabulary phrases in an utterance.
///
/// Longer phrases are tried first and a matched span is consumed, so
/// "senior consultant" never also yields "consultant" and "business
/// analyst" never also yields the rank "analyst". Plural forms of a
/// phrase's last word match too.
pub struct PhraseScanner {
    words: Vec<Option<String>>,
}

impl PhraseScanner {
    pub fn new(text: &str) -> Self {
        Self {
            words: normalize_text(text)
                .split(' ')
                .filter(|w| !w.is_empty())
                .map(|w| Some(w.to_string()))
                .collect(),
        }
    }

    /// Consume and return every phrase from `table` found in the text.
    fn take(&mut self, table: &[(String, &'static str)]) -> Vec<&'static str> {
        let mut entries: Vec<(Vec<&str>, &'static str)> = table
            .iter()
            .map(|(phrase, value)| (phrase.split(' ').collect(), *value))
            .collect();
        entries.sort_by_key(|(words, _)| Reverse(words.len()));

        let mut found = Vec::new();
        for (phrase, value) in entries {
            let n = phrase.len();
            if n == 0 || n > self.words.len() {
                continue;
            }
            let mut start = 0;
            while start + n <= self.words.len() {
                if self.matches_at(start, &phrase) {
                    for slot in &mut self.words[start..start + n] {
                        *slot = None;
                    }
                    if !found.contains(&value) {
                        found.push(value);
                    }
                    start += n;
                } else {
                    start += 1;
                }
            }
        }
        found
    }

    fn matches_at(&self, start: usize, phrase: &[&str]) -> bool {
        phrase.iter().enumerate().all(|(i, expected)| {
            let Some(word) = self.words[start + i].as_deref() else {
                return false;
            };
            if i + 1 == phrase.len() {
                singulars(word).any(|w| w == *expected)
            } else {
                word == *expected
            }
        })
    }

    /// Regions (by name) and known locations.
    pub fn take_locations(&mut self) -> Vec<&'static str> {
        let mut table: Vec<(String, &'static str)> = REGION_ALIASES
            .iter()
            .filter(|(alias, _)| !PROSE_AMBIGUOUS.contains(alias))
            .map(|(alias, region)| (alias.to_string(), *region))
            .collect();
        table.extend(known_locations().map(|loc| (normalize_text(loc), loc)));
        self.take(&table)
    }

    /// Canonical skills and their synonyms.
    pub fn take_skills(&mut self) -> Vec<&'static str> {
        let mut table: Vec<(String, &'static str)> = CANONICAL_SKILLS
            .iter()
            .map(|skill| (normalize_text(skill), *skill))
            .collect();
        table.extend(
            SKILL_SYNONYMS
                .iter()
                .map(|(alias, skill)| (alias.to_string(), *skill)),
        );
        self.take(&table)
    }

    /// Canonical rank names. Bare aliases like "senior" are too loose for
    /// prose; only "partnership" is scanned besides the full names.
    pub fn take_ranks(&mut self) -> Vec<&'static str> {
        let mut table: Vec<(String, &'static str)> =
            all_ranks().map(|rank| (normalize_text(rank), rank)).collect();
        table.push(("partnership".into(), TOP_RANK));
        self.take(&table)
    }

    /// Remaining (unconsumed) words in order.
    pub fn remaining(&self) -> Vec<&str> {
        self.words.iter().filter_map(|w| w.as_deref()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_expand_case_insensitively() {
        assert_eq!(expand_location("NORDICS"), vec!["Oslo", "Stockholm", "Copenhagen"]);
        assert_eq!(expand_location("Scandinavia"), vec!["Oslo", "Stockholm", "Copenhagen"]);
        assert_eq!(expand_location("united kingdom").len(), 4);
        assert_eq!(expand_location("usa"), vec!["New York", "Chicago", "San Francisco"]);
    }

    #[test]
    fn cities_expand_to_themselves_and_unknowns_vanish() {
        assert_eq!(expand_location("new york"), vec!["New York"]);
        assert!(expand_location("Atlantis").is_empty());
    }

    #[test]
    fn region_expansion_is_idempotent() {
        for (name, _) in REGIONS {
            let once: Vec<&str> = expand_location(name);
            let twice: Vec<&str> = once.iter().flat_map(|l| expand_location(l)).collect();
            assert_eq!(once, twice, "region {name}");
        }
    }

    #[test]
    fn rank_levels_and_coequals() {
        assert_eq!(rank_level("partner"), Some(0));
        assert_eq!(rank_level("Associate Partner"), rank_level("Consulting Director"));
        assert_eq!(rank_level("Analyst"), Some(lowest_rank_level()));
        assert_eq!(rank_level("Intern"), None);
        assert_eq!(all_ranks().count(), 9);
    }

    #[test]
    fn rank_aliases_and_plurals() {
        assert_eq!(canonical_rank("partners"), Some("Partner"));
        assert_eq!(canonical_rank("Partnership"), Some("Partner"));
        assert_eq!(canonical_rank("principal"), Some("Principal Consultant"));
        assert_eq!(canonical_rank("senior"), Some("Senior Consultant"));
        assert_eq!(canonical_rank("consultant analysts"), Some("Consultant Analyst"));
        assert_eq!(canonical_rank("Agile Coach"), None);
    }

    #[test]
    fn skill_synonyms_resolve() {
        assert_eq!(canonical_skill("front-end"), Some("Frontend Developer"));
        assert_eq!(canonical_skill("Frontend Developers"), Some("Frontend Developer"));
        assert_eq!(canonical_skill("full stack"), Some("Full Stack Developer"));
        assert_eq!(canonical_skill("agile coaches"), Some("Agile Coach"));
        assert_eq!(canonical_skill("scrum masters"), Some("Scrum Master"));
        assert_eq!(canonical_skill("DATA"), Some("Data Engineer"));
        assert_eq!(canonical_skill("python"), None);
    }

    #[test]
    fn substring_matching_is_allow_listed() {
        assert_eq!(canonical_skill("react frontend engineer"), Some("Frontend Developer"));
        assert_eq!(canonical_skill("senior devops person"), Some("DevOps Engineer"));
        // "data" is a whole-token synonym only
        assert_eq!(canonical_skill("database admin"), None);
    }

    #[test]
    fn scanner_prefers_longest_phrase() {
        let mut scanner = PhraseScanner::new("Senior consultants and business analysts in New York");
        assert_eq!(scanner.take_locations(), vec!["New York"]);
        assert_eq!(scanner.take_skills(), vec!["Business Analyst"]);
        assert_eq!(scanner.take_ranks(), vec!["Senior Consultant"]);
        assert_eq!(scanner.remaining(), vec!["and", "in"]);
    }

    #[test]
    fn scanner_skips_ambiguous_region_words() {
        let mut scanner = PhraseScanner::new("find us partners in the nordics");
        assert_eq!(scanner.take_locations(), vec!["Nordics"]);
        assert_eq!(scanner.take_ranks(), vec!["Partner"]);
    }
}
