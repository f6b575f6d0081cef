//! # ResGenie Core
//!
//! Domain types, collaborator traits, and error definitions for the ResGenie
//! staffing query engine. This crate defines the domain model that all other
//! crates implement against.
//!
//! ## Design Philosophy
//!
//! Both external collaborators are traits here: the language model behind
//! query extraction (`Provider`) and the employee directory
//! (`DocumentStore`). Implementations live in their respective crates. This
//! enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/in-memory implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod query;
pub mod employee;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, LookupError, ProviderError, Result};
pub use message::{Conversation, ConversationId, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use query::{AvailabilityStatus, StructuredQuery};
pub use employee::{AvailabilityWeek, Employee, MissingWeekPolicy, WeekStatus};
pub use store::{DocumentStore, EmployeeFilter, FieldFilter};
