//! Query parsing and relevance scoring over the document store.
//!
//! [`QueryParser`] turns user query strings into structured [`Query`] values
//! (phrase, AND/NOT, fielded and fuzzy terms); [`SearchEngine`] ranks stored
//! documents against them.

pub mod engine;
pub mod error;
pub mod fuzzy;
pub mod parser;
pub mod query;

pub use engine::{FacetCount, SearchEngine, SearchHit, SearchMetadata, SearchResults};
pub use error::{Result, SearchError};
pub use parser::QueryParser;
pub use query::{Query, QueryTerm, SortField, SortSpec, TermField, TermKind};
