//! Message Router
//!
//! Resolves routing directives (SELF/OTHERS/GROUP/BROADCAST/SESSION/USER)
//! into a concrete set of target sessions and a delivery queue, then
//! dispatches through the publish primitive.
//!
//! All resolvers for one message work against a single snapshot of the
//! registry taken when routing begins, so GROUP and OTHERS can never observe
//! different presence states for the same message.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::application::services::registry::ConnectionRegistry;
use crate::domain::ports::{EventPublisher, GroupDirectory, UserSessionIndex};
use crate::domain::routing::{queues, Route, RouteContext, GROUP_PREFIX};
use crate::infrastructure::metrics;

/// Router over the fixed route set.
pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    publisher: Arc<dyn EventPublisher>,
    user_index: Arc<dyn UserSessionIndex>,
    groups: Arc<dyn GroupDirectory>,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        publisher: Arc<dyn EventPublisher>,
        user_index: Arc<dyn UserSessionIndex>,
        groups: Arc<dyn GroupDirectory>,
    ) -> Self {
        Self {
            registry,
            publisher,
            user_index,
            groups,
        }
    }

    /// Route one inbound message: resolve the requested routes, deliver to
    /// every resolved target, then record the routing audit event.
    ///
    /// A delivery failure for one target is logged and does not abort
    /// delivery to the remaining targets.
    pub fn route_message(
        &self,
        session_id: &str,
        payload: Value,
        message: Map<String, Value>,
        route_names: &[&str],
    ) {
        let context = self.resolve_routes(session_id, payload, message, route_names);
        self.deliver(&context);

        tracing::info!(
            session_id = %context.session_id,
            routes = ?route_names,
            targets = context.target_sessions.len(),
            queue = %context.queue(),
            "Message routed"
        );
    }

    /// Build a fresh routing context and run every requested resolver against
    /// it. Unknown route names are skipped with a diagnostic. Later routes may
    /// overwrite the queue metadata; a message routed to several audiences
    /// ends up with one final addressing attribute.
    pub fn resolve_routes(
        &self,
        session_id: &str,
        payload: Value,
        message: Map<String, Value>,
        route_names: &[&str],
    ) -> RouteContext {
        let snapshot = self.registry.active_session_ids();
        let mut context = RouteContext::new(session_id, payload, message, snapshot);

        for name in route_names {
            match Route::from_name(name) {
                Some(route) => {
                    self.resolve(route, &mut context);
                    metrics::record_routed_message(route.as_str());
                }
                None => {
                    tracing::debug!(route = %name, "Unknown route name, skipping");
                }
            }
        }

        context
    }

    /// Run one route resolver against the context.
    pub fn resolve(&self, route: Route, context: &mut RouteContext) {
        match route {
            Route::ToSelf => self.resolve_self(context),
            Route::Others => self.resolve_others(context),
            Route::Group => self.resolve_group(context),
            Route::Broadcast => self.resolve_broadcast(context),
            Route::Session => self.resolve_session(context),
            Route::User => self.resolve_user(context),
        }
    }

    fn resolve_self(&self, context: &mut RouteContext) {
        context.target_sessions.insert(context.session_id.clone());
        context
            .metadata
            .insert("queue".into(), queues::MESSAGES_ALL.into());
    }

    fn resolve_others(&self, context: &mut RouteContext) {
        let originator = context.session_id.clone();
        for session in &context.active_snapshot {
            if *session != originator {
                context.target_sessions.insert(session.clone());
            }
        }
        context.metadata.insert("queue".into(), queues::OTHERS.into());
    }

    fn resolve_group(&self, context: &mut RouteContext) {
        let chat_id = match context.message_str("chat_id") {
            Some(id) if id.starts_with(GROUP_PREFIX) => id.to_string(),
            _ => return,
        };

        let members = self.groups.group_sessions(&chat_id);
        for session in &context.active_snapshot {
            if members.contains(session) {
                context.target_sessions.insert(session.clone());
            }
        }
        context.metadata.insert("group_id".into(), chat_id.clone());
        context.metadata.insert("queue".into(), queues::group(&chat_id));
    }

    fn resolve_broadcast(&self, context: &mut RouteContext) {
        let snapshot = context.active_snapshot.clone();
        context.target_sessions.extend(snapshot);
        context
            .metadata
            .insert("queue".into(), queues::BROADCAST.into());
    }

    fn resolve_session(&self, context: &mut RouteContext) {
        let target = match context.message_str("target_session") {
            Some(target) => target.to_string(),
            None => return,
        };

        let queue = if target == context.session_id {
            queues::SELF
        } else {
            queues::OTHERS
        };
        context.target_sessions.insert(target);
        context.metadata.insert("queue".into(), queue.into());
    }

    fn resolve_user(&self, context: &mut RouteContext) {
        let user_id = match context.message_str("target_user_id") {
            Some(id) => id.to_string(),
            None => return,
        };

        if let Some(session) = self.user_index.session_by_user_id(&user_id) {
            context.target_sessions.insert(session);
            context.metadata.insert("queue".into(), queues::DIRECT.into());
        }
    }

    /// Deliver the routed message to every target. The sender's own copy goes
    /// out on the self queue variant, everyone else's on the others variant,
    /// so clients can render their own echo differently.
    fn deliver(&self, context: &RouteContext) {
        let event = context
            .message
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or("message")
            .to_string();
        let body = Value::Object(context.message.clone());

        for target in &context.target_sessions {
            let queue = if *target == context.session_id {
                queues::SELF
            } else {
                queues::OTHERS
            };

            tracing::debug!(
                target = %target,
                queue = %queue,
                "Sending routed message"
            );

            if let Err(err) = self.publisher.publish(target, queue, &event, body.clone()) {
                metrics::record_delivery_failure(queue);
                tracing::warn!(
                    target = %target,
                    queue = %queue,
                    "Delivery failed: {}",
                    err
                );
            }
        }
    }
}
