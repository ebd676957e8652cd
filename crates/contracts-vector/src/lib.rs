//! Vector store backends: LanceDB on disk and an in-memory store.

pub mod memory;
pub mod schema;
pub mod store;
pub mod table;

pub use memory::InMemoryVectorStore;
pub use store::LanceVectorStore;
