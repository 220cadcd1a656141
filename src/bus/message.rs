//! Bus message types: headers, the inbound envelope, and replies.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::Failure;

/// Header carrying the action name of a request.
pub const ACTION_HEADER: &str = "action";

/// Outcome of a request: a JSON payload or a typed failure.
pub type Reply = Result<serde_json::Value, Failure>;

/// String-to-string message headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    /// Creates empty headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates headers carrying only the given `action`.
    #[must_use]
    pub fn action(name: &str) -> Self {
        let mut headers = Self::new();
        headers.insert(ACTION_HEADER, name);
        headers
    }

    /// Sets a header, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the value of a header.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

/// A request delivered to a consumer.
///
/// Answered exactly once through [`Message::reply`] or [`Message::fail`];
/// both consume the message. Dropping it unanswered makes the requester
/// observe [`crate::error::BusError::NoReply`].
#[derive(Debug)]
pub struct Message {
    id: Uuid,
    headers: Headers,
    body: serde_json::Value,
    reply_tx: oneshot::Sender<Reply>,
}

impl Message {
    pub(crate) fn new(
        headers: Headers,
        body: serde_json::Value,
        reply_tx: oneshot::Sender<Reply>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            headers,
            body,
            reply_tx,
        }
    }

    /// Bus-assigned message identifier, used for log correlation.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Message headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Message body.
    #[must_use]
    pub const fn body(&self) -> &serde_json::Value {
        &self.body
    }

    /// Answers with a success payload.
    pub fn reply(self, payload: serde_json::Value) {
        self.respond(Ok(payload));
    }

    /// Answers with a typed failure.
    pub fn fail(self, failure: Failure) {
        self.respond(Err(failure));
    }

    /// Answers with a complete [`Reply`].
    pub fn respond(self, reply: Reply) {
        if self.reply_tx.send(reply).is_err() {
            tracing::debug!(id = %self.id, "requester went away before the reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_constructor_sets_header() {
        let headers = Headers::action("all-pages");
        assert!(headers.contains(ACTION_HEADER));
        assert_eq!(headers.get(ACTION_HEADER), Some("all-pages"));
        assert_eq!(headers.get("other"), None);
    }

    #[tokio::test]
    async fn fail_delivers_failure() {
        let (tx, rx) = oneshot::channel();
        let message = Message::new(Headers::new(), serde_json::Value::Null, tx);
        message.fail(Failure::no_action());
        assert_eq!(rx.await.ok(), Some(Err(Failure::no_action())));
    }
}
