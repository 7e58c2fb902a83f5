//! Document store and inverted index.
//!
//! Two backends implement the [`StorageAdapter`] contract: [`MemoryStorage`]
//! (process-lifetime, the default for tests) and [`TantivyStorage`] (durable,
//! tantivy-backed). Documents are keyed on their canonical URL; storing twice
//! under one URL keeps the latest write.

pub mod adapter;
pub mod document;
pub mod error;
pub mod index;
pub mod memory;

pub use adapter::{StorageAdapter, StorageStats};
pub use document::{is_reserved_field, Document, MetaValue, RESERVED_FIELDS};
pub use error::{Result, StorageError};
pub use index::TantivyStorage;
pub use memory::MemoryStorage;
