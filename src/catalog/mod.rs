pub mod document;
pub mod index;
pub mod store;
pub mod types;

pub use index::VectorIndex;
pub use store::{CatalogState, CatalogStore};
pub use types::{TableRecord, ToolRecord};
