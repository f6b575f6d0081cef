//! The ResGenie request engine.
//!
//! - `matcher`: store pushdown, client-side verification, top-rank fallback
//! - `availability`: batched week lookup and status/hours filtering
//! - `cache`: fingerprinted TTL + FIFO response cache
//! - `pipeline`: resolve → match → availability for one conversation turn

pub mod availability;
pub mod cache;
pub mod matcher;
pub mod pipeline;

pub use availability::{AvailabilityResolver, status_matches};
pub use cache::{CacheStats, ResponseCache, fingerprint, process_counters};
pub use matcher::{FallbackNotice, MatchOutcome, ResourceMatcher, SampleMatch};
pub use pipeline::{ConversationContext, MatchResult, MatchedEmployee, Pipeline, PipelineOutcome};
