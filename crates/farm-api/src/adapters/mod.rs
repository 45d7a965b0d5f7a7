//! Default adapters for the external-collaborator ports.

pub mod directory;
pub mod storage;

pub use directory::InMemoryDirectory;
pub use storage::HttpStorage;
