//! Employee directory adapters for ResGenie.
//!
//! Both adapters implement `resgenie_core::DocumentStore` over the same
//! in-process `Directory`: the in-memory store is seeded through code, the
//! file store from a JSON document on disk.

mod directory;
pub mod file;
pub mod in_memory;

pub use directory::DirectoryDocument;
pub use file::FileStore;
pub use in_memory::InMemoryStore;
