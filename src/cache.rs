//! Content cache module
//!
//! Key derivation plus the pluggable store the orchestrator reads through.

mod filesystem;
pub mod key;
mod memory;
pub mod store;

pub use filesystem::FilesystemStore;
pub use key::CacheKey;
pub use memory::MemoryStore;
pub use store::{CacheError, CachedArtifact, ContentStore};
