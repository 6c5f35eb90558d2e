pub mod catalog;

pub use catalog::{DirectoryCatalog, FileStore, StoredFile};
