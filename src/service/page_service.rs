//! Page service: consumes the bus address and answers page requests.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::action::Action;
use crate::bus::{ACTION_HEADER, Headers, Message, MessageBus, Reply};
use crate::config::ServiceConfig;
use crate::error::{ErrorCode, StartupError};
use crate::persistence::{PageList, PageLookup, PageStore, QueryCatalog, pool};

/// Acknowledgement returned by mutating actions.
pub const OK_REPLY: &str = "ok";

/// Dispatches decoded actions to the [`PageStore`].
///
/// Cheap to clone; each inbound message is handled on its own task with
/// its own clone. No page state is kept between requests.
#[derive(Debug, Clone)]
pub struct PageService {
    store: PageStore,
}

impl PageService {
    /// Creates a service over an already prepared store.
    #[must_use]
    pub const fn new(store: PageStore) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &PageStore {
        &self.store
    }

    /// Starts the service: loads the query catalog, opens the pool, ensures
    /// the pages table exists, and begins consuming `config.queue`.
    ///
    /// Nothing is consumed unless every step succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`StartupError`] describing the first step that failed.
    pub async fn deploy(
        config: &ServiceConfig,
        bus: &MessageBus,
    ) -> Result<Deployment, StartupError> {
        let catalog = QueryCatalog::load(config.sql_queries_resource.as_deref())?;
        let pool = pool::connect(config).await?;
        let store = PageStore::new(pool, Arc::new(catalog), config.query_timeout);

        if let Err(err) = store.ensure_table().await {
            tracing::error!(error = %err, "database preparation error");
            store.close().await;
            return Err(StartupError::Prepare(err));
        }

        Self::new(store).start(bus, &config.queue).await
    }

    /// Registers as the consumer of `address` and spawns the consumer loop.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Bus`] if the address already has a consumer;
    /// the pool is closed in that case.
    pub async fn start(self, bus: &MessageBus, address: &str) -> Result<Deployment, StartupError> {
        let rx = match bus.consumer(address).await {
            Ok(rx) => rx,
            Err(err) => {
                self.store.close().await;
                return Err(err.into());
            }
        };

        let task = tokio::spawn(self.clone().consume(rx));
        tracing::info!(address, "page service ready");

        Ok(Deployment {
            address: address.to_string(),
            bus: bus.clone(),
            service: self,
            task,
        })
    }

    /// Decodes and executes one request.
    pub async fn handle(&self, headers: &Headers, body: &serde_json::Value) -> Reply {
        let action = Action::decode(headers, body)?;
        self.execute(action).await
    }

    /// Executes a decoded action.
    pub async fn execute(&self, action: Action) -> Reply {
        match action {
            Action::AllPages => {
                let titles = self.store.all_titles().await?;
                Ok(to_payload(&PageList::sorted(titles)))
            }
            Action::GetPage { page } => {
                let found = self.store.find_by_title(&page).await?;
                Ok(to_payload(&PageLookup::from(found)))
            }
            Action::CreatePage { title, markdown } => {
                self.store.create(&title, &markdown).await?;
                tracing::info!(%title, "page created");
                Ok(ok_reply())
            }
            Action::SavePage { id, markdown } => {
                let rows = self.store.save(&id, &markdown).await?;
                tracing::info!(%id, rows, "page saved");
                Ok(ok_reply())
            }
            Action::DeletePage { id } => {
                let rows = self.store.delete(&id).await?;
                tracing::info!(%id, rows, "page deleted");
                Ok(ok_reply())
            }
        }
    }

    async fn consume(self, mut rx: mpsc::Receiver<Message>) {
        while let Some(message) = rx.recv().await {
            let span = tracing::info_span!(
                "message",
                id = %message.id(),
                action = message.headers().get(ACTION_HEADER).unwrap_or("-"),
            );
            let service = self.clone();
            tokio::spawn(async move { service.on_message(message).await }.instrument(span));
        }
        tracing::debug!("consumer loop finished");
    }

    async fn on_message(&self, message: Message) {
        let reply = self.handle(message.headers(), message.body()).await;
        if let Err(failure) = &reply {
            match failure.code {
                ErrorCode::NoActionSpecified => tracing::error!(
                    headers = ?message.headers(),
                    body = %message.body(),
                    "no action header specified"
                ),
                ErrorCode::BadAction => tracing::warn!(reason = %failure.message, "bad action"),
                ErrorCode::DatabaseError => {
                    tracing::error!(error = %failure.message, "database query error");
                }
            }
        }
        message.respond(reply);
    }
}

/// A running [`PageService`] bound to a bus address.
#[derive(Debug)]
pub struct Deployment {
    address: String,
    bus: MessageBus,
    service: PageService,
    task: JoinHandle<()>,
}

impl Deployment {
    /// Address the service consumes.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The deployed service.
    #[must_use]
    pub const fn service(&self) -> &PageService {
        &self.service
    }

    /// Stops consuming, then closes the connection pool.
    pub async fn shutdown(self) {
        self.bus.unregister(&self.address).await;
        self.task.abort();
        self.service.store.close().await;
        tracing::info!(address = %self.address, "page service stopped");
    }
}

fn to_payload<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_default()
}

fn ok_reply() -> serde_json::Value {
    serde_json::Value::String(OK_REPLY.to_string())
}
