//! zotsieve-zotero: Zotero Web API backend for the matching engine.

pub mod error;
pub mod http;
pub mod provider;

pub use error::{Result, ZoteroError};
pub use provider::ZoteroSearchProvider;
