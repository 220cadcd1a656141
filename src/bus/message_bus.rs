//! Named-address request/reply bus.
//!
//! [`MessageBus`] maps addresses to bounded [`tokio::sync::mpsc`] channels.
//! A requester sends a [`Message`] carrying a one-shot reply channel and
//! awaits the answer; the consumer decides how to schedule the work.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, oneshot};

use super::message::{Headers, Message};
use crate::error::BusError;

/// Cloneable handle to the in-process message bus.
///
/// Each address has at most one consumer. Channels are bounded by the
/// capacity given to [`MessageBus::new`]; requesters wait for buffer space
/// instead of failing.
#[derive(Debug, Clone)]
pub struct MessageBus {
    capacity: usize,
    consumers: Arc<RwLock<HashMap<String, mpsc::Sender<Message>>>>,
}

impl MessageBus {
    /// Creates an empty bus whose address buffers hold `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            consumers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers the consumer for `address` and returns its receiver.
    ///
    /// A previous consumer whose receiver has been dropped is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::AddressInUse`] if a live consumer already
    /// exists for the address.
    pub async fn consumer(&self, address: &str) -> Result<mpsc::Receiver<Message>, BusError> {
        let mut map = self.consumers.write().await;
        if map.get(address).is_some_and(|tx| !tx.is_closed()) {
            return Err(BusError::AddressInUse(address.to_string()));
        }
        let (tx, rx) = mpsc::channel(self.capacity);
        map.insert(address.to_string(), tx);
        tracing::debug!(address, "consumer registered");
        Ok(rx)
    }

    /// Removes the consumer for `address`, if any.
    ///
    /// Returns `true` if a consumer was registered.
    pub async fn unregister(&self, address: &str) -> bool {
        self.consumers.write().await.remove(address).is_some()
    }

    /// Returns `true` if a live consumer is registered for `address`.
    pub async fn has_consumer(&self, address: &str) -> bool {
        self.consumers
            .read()
            .await
            .get(address)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Sends a request to `address` and waits for its reply.
    ///
    /// # Errors
    ///
    /// - [`BusError::NoHandlers`] if nothing consumes the address.
    /// - [`BusError::NoReply`] if the consumer drops the message unanswered.
    /// - [`BusError::Failed`] if the consumer answers with a failure.
    pub async fn request(
        &self,
        address: &str,
        headers: Headers,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, BusError> {
        let sender = self
            .consumers
            .read()
            .await
            .get(address)
            .cloned()
            .ok_or_else(|| BusError::NoHandlers(address.to_string()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        sender
            .send(Message::new(headers, body, reply_tx))
            .await
            .map_err(|_| BusError::NoHandlers(address.to_string()))?;

        match reply_rx.await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(failure)) => Err(BusError::Failed(failure)),
            Err(_) => Err(BusError::NoReply(address.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::error::Failure;

    #[tokio::test]
    async fn request_without_consumer_fails() {
        let bus = MessageBus::new(8);
        let result = bus
            .request("nowhere", Headers::new(), serde_json::Value::Null)
            .await;
        assert_eq!(result, Err(BusError::NoHandlers("nowhere".to_string())));
    }

    #[tokio::test]
    async fn consumer_reply_reaches_requester() {
        let bus = MessageBus::new(8);
        let Ok(mut rx) = bus.consumer("echo").await else {
            panic!("registration failed");
        };
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let body = message.body().clone();
                message.reply(body);
            }
        });

        let reply = bus
            .request("echo", Headers::action("x"), serde_json::json!({ "a": 1 }))
            .await;
        assert_eq!(reply, Ok(serde_json::json!({ "a": 1 })));
    }

    #[tokio::test]
    async fn failure_reply_is_typed() {
        let bus = MessageBus::new(8);
        let Ok(mut rx) = bus.consumer("strict").await else {
            panic!("registration failed");
        };
        tokio::spawn(async move {
            if let Some(message) = rx.recv().await {
                message.fail(Failure::bad_action("nope"));
            }
        });

        let reply = bus
            .request("strict", Headers::new(), serde_json::Value::Null)
            .await;
        assert_eq!(reply, Err(BusError::Failed(Failure::bad_action("nope"))));
    }

    #[tokio::test]
    async fn dropped_message_reports_no_reply() {
        let bus = MessageBus::new(8);
        let Ok(mut rx) = bus.consumer("sink").await else {
            panic!("registration failed");
        };
        tokio::spawn(async move {
            let _ = rx.recv().await;
        });

        let reply = bus
            .request("sink", Headers::new(), serde_json::Value::Null)
            .await;
        assert_eq!(reply, Err(BusError::NoReply("sink".to_string())));
    }

    #[tokio::test]
    async fn second_live_consumer_is_rejected() {
        let bus = MessageBus::new(8);
        let Ok(_rx) = bus.consumer("busy").await else {
            panic!("registration failed");
        };
        let second = bus.consumer("busy").await;
        assert!(matches!(second, Err(BusError::AddressInUse(_))));
        assert!(bus.has_consumer("busy").await);
    }

    #[tokio::test]
    async fn dropped_consumer_can_be_replaced() {
        let bus = MessageBus::new(8);
        let Ok(rx) = bus.consumer("again").await else {
            panic!("registration failed");
        };
        drop(rx);
        assert!(!bus.has_consumer("again").await);
        assert!(bus.consumer("again").await.is_ok());
        assert!(bus.unregister("again").await);
    }
}
