//! Event Dispatch Table
//!
//! Process-wide registry of event name → handler + routing policy.
//! Dispatch looks up the handler, validates the payload into its typed form,
//! runs the handler, and fans out the result according to the config.
//!
//! A failure inside one event's handler never affects other events and never
//! escapes the dispatch loop: it becomes an error envelope on the
//! originator's private error queue.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{json, Value};

use crate::application::services::registry::ConnectionRegistry;
use crate::application::services::router::MessageRouter;
use crate::domain::envelope::EventPayload;
use crate::domain::ports::{EventPublisher, GroupDirectory, UserSessionIndex};
use crate::domain::routing::queues;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Handler function for one event.
pub type EventHandler =
    Arc<dyn Fn(&str, &EventPayload, &DispatchContext) -> Result<Value, AppError> + Send + Sync>;

/// Collaborators handed to every handler invocation.
pub struct DispatchContext {
    pub registry: Arc<ConnectionRegistry>,
    pub publisher: Arc<dyn EventPublisher>,
    pub router: Arc<MessageRouter>,
    pub user_index: Arc<dyn UserSessionIndex>,
    pub groups: Arc<dyn GroupDirectory>,
}

/// Registration for one event name.
#[derive(Clone)]
pub struct EventHandlerConfig {
    /// Unique event name (registration key)
    pub event_name: String,
    /// Handler invoked with the validated payload
    pub handler: EventHandler,
    /// Send the handler result to all active sessions (true) or only back to
    /// the originator (false) when a destination is set
    pub broadcast: bool,
    /// Logical delivery address for the handler result, if any
    pub destination: Option<String>,
}

impl EventHandlerConfig {
    pub fn new(
        event_name: impl Into<String>,
        handler: EventHandler,
        broadcast: bool,
        destination: Option<String>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            handler,
            broadcast,
            destination,
        }
    }
}

/// Registry of event handlers, keyed by event name. Registration is
/// last-write-wins per name.
pub struct EventDispatchTable {
    events: DashMap<String, EventHandlerConfig>,
}

impl EventDispatchTable {
    pub fn new() -> Self {
        Self {
            events: DashMap::new(),
        }
    }

    pub fn register(&self, config: EventHandlerConfig) {
        tracing::debug!(event = %config.event_name, "Registered event handler");
        self.events.insert(config.event_name.clone(), config);
    }

    pub fn register_all(&self, configs: Vec<EventHandlerConfig>) {
        for config in configs {
            self.register(config);
        }
    }

    pub fn get(&self, event_name: &str) -> Option<EventHandlerConfig> {
        self.events.get(event_name).map(|entry| entry.clone())
    }

    pub fn list_all(&self) -> Vec<EventHandlerConfig> {
        self.events.iter().map(|entry| entry.clone()).collect()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Dispatch one inbound event.
    ///
    /// Unknown events are logged and dropped with no feedback to the sender.
    /// Payload validation failures and handler errors both follow the
    /// handler-failure path: an `{error, details}` envelope on the sender's
    /// private error queue, nothing anywhere else.
    pub fn dispatch(&self, event_name: &str, session_id: &str, data: Value, ctx: &DispatchContext) {
        let config = match self.get(event_name) {
            Some(config) => config,
            None => {
                metrics::record_unknown_event(event_name);
                tracing::warn!(event = %event_name, "No handler found for event");
                return;
            }
        };

        let payload = match EventPayload::parse(event_name, data) {
            Ok(payload) => payload,
            Err(err) => {
                self.handle_failure(event_name, session_id, &err, ctx);
                return;
            }
        };

        match (config.handler)(session_id, &payload, ctx) {
            Ok(result) => {
                if let Some(destination) = &config.destination {
                    self.send_result(&config, destination, session_id, result, ctx);
                }
            }
            Err(err) => {
                self.handle_failure(event_name, session_id, &err, ctx);
            }
        }
    }

    /// Fan the handler result out to its destination: every active session
    /// for broadcast configs, otherwise only the originator's private queue.
    fn send_result(
        &self,
        config: &EventHandlerConfig,
        destination: &str,
        session_id: &str,
        result: Value,
        ctx: &DispatchContext,
    ) {
        if config.broadcast {
            for target in ctx.registry.active_session_ids() {
                if let Err(err) =
                    ctx.publisher
                        .publish(&target, destination, &config.event_name, result.clone())
                {
                    metrics::record_delivery_failure(destination);
                    tracing::warn!(
                        target = %target,
                        destination = %destination,
                        "Failed to deliver handler result: {}",
                        err
                    );
                }
            }
        } else if let Err(err) =
            ctx.publisher
                .publish(session_id, destination, &config.event_name, result)
        {
            metrics::record_delivery_failure(destination);
            tracing::warn!(
                session_id = %session_id,
                destination = %destination,
                "Failed to deliver handler result: {}",
                err
            );
        }
    }

    /// Contain a handler failure: log, count, and send a best-effort error
    /// envelope to the originator's error queue.
    fn handle_failure(&self, event_name: &str, session_id: &str, err: &AppError, ctx: &DispatchContext) {
        metrics::record_dispatch_failure(event_name);
        tracing::error!(
            event = %event_name,
            session_id = %session_id,
            "Error handling event: {}",
            err
        );

        let envelope = json!({
            "error": event_name,
            "details": err.to_string(),
        });
        if let Err(publish_err) =
            ctx.publisher
                .publish(session_id, queues::ERRORS, "error", envelope)
        {
            tracing::warn!(
                session_id = %session_id,
                "Failed to deliver error envelope: {}",
                publish_err
            );
        }
    }
}

impl Default for EventDispatchTable {
    fn default() -> Self {
        Self::new()
    }
}
