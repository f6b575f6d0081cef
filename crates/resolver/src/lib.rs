//! Query resolution for ResGenie.
//!
//! Turns a free-text staffing question (plus the previous turn's query)
//! into a canonical `StructuredQuery`:
//!
//! - `vocabulary`: regions, the rank hierarchy, skill synonyms
//! - `hierarchy`: "above X", "between X and Y" → concrete rank names
//! - `followup`: NEW vs FOLLOW_UP classification
//! - `extraction`: LLM extraction with tolerant parsing and keyword fallback
//! - `translator`: the `QueryResolver` tying it together

pub mod extraction;
pub mod followup;
pub mod hierarchy;
pub mod translator;
pub mod vocabulary;

pub use extraction::{ExtractionOutcome, Extractor, LlmExtractor, RawFields, keyword_fields, parse_extraction};
pub use followup::{QueryKind, classify};
pub use hierarchy::{RankHierarchyResolver, RankRelation, RankResolution, parse_relation};
pub use translator::{QueryResolver, Translation, TranslationSource};
