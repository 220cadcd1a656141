//! In-process message bus.
//!
//! Callers (for example an HTTP layer) send action-tagged requests to a
//! named address and await a typed reply. The persistence service is the
//! consumer of its configured address.

pub mod message;
pub mod message_bus;

pub use message::{ACTION_HEADER, Headers, Message, Reply};
pub use message_bus::MessageBus;
