pub mod chroma_client;
pub mod store;
pub mod types;

pub use store::MemoryStore;
pub use types::SearchResult;
