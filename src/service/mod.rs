//! Service layer: action decoding and dispatch.
//!
//! [`PageService`] consumes its bus address, decodes each message into an
//! [`Action`], and runs it against the [`super::persistence::PageStore`].

pub mod action;
pub mod page_service;

pub use action::Action;
pub use page_service::{Deployment, PageService};
