//! # wikidb
//!
//! Asynchronous persistence service for wiki pages.
//!
//! Requests arrive on an in-process message bus tagged with an `action`
//! header. Each one is decoded into a typed action, translated into an
//! externalized SQL statement, run on a pooled connection, and answered
//! with a JSON payload or a typed failure.
//!
//! ## Architecture
//!
//! ```text
//! Callers (e.g. an HTTP layer)
//!     │
//!     ├── MessageBus (bus/)
//!     │
//!     ├── PageService (service/)
//!     │     └── Action decoding
//!     │
//!     ├── PageStore + QueryCatalog (persistence/)
//!     │
//!     └── sqlx AnyPool (PostgreSQL / SQLite)
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod persistence;
pub mod service;
