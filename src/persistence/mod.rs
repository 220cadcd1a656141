//! Persistence layer: externalized queries and the pooled page store.
//!
//! [`QueryCatalog`] holds the statement text, [`PageStore`] runs it on a
//! `sqlx::AnyPool` so the same service code drives PostgreSQL in
//! production and SQLite in tests.

pub mod models;
pub mod pool;
pub mod queries;
pub mod store;

pub use models::{Page, PageList, PageLookup, RawPageId};
pub use queries::{QueryCatalog, QueryName};
pub use store::PageStore;
