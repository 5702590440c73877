//! Built-in event handler configurations.
//!
//! The application's event set is registered once at startup via
//! [`EventDispatchTable::register_all`]. Handlers receive the validated,
//! typed payload for their event; routing decisions go through the router.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::application::services::dispatch::{DispatchContext, EventHandlerConfig};
use crate::domain::envelope::EventPayload;
use crate::domain::routing::GROUP_PREFIX;
use crate::shared::error::AppError;

/// All built-in event configs.
pub fn default_event_configs() -> Vec<EventHandlerConfig> {
    vec![
        chat_config(),
        direct_config(),
        set_username_config(),
        join_group_config(),
        leave_group_config(),
        typing_config(),
        ping_config(),
    ]
}

fn username_for(ctx: &DispatchContext, session_id: &str) -> String {
    ctx.registry
        .get(session_id)
        .map(|record| record.username)
        .unwrap_or_else(|| "Anonymous".to_string())
}

fn message_map(fields: Value) -> Map<String, Value> {
    fields.as_object().cloned().unwrap_or_default()
}

/// `chat`: room or group chat message. Group chat ids (reserved prefix)
/// route through GROUP; everything else echoes to the sender and fans out to
/// the other active sessions.
fn chat_config() -> EventHandlerConfig {
    EventHandlerConfig::new(
        "chat",
        Arc::new(|session_id, payload, ctx| {
            let chat = match payload {
                EventPayload::Chat(chat) => chat,
                _ => return Err(AppError::Handler("chat handler got a non-chat payload".into())),
            };

            let message = message_map(json!({
                "event": "chat",
                "message": chat.message,
                "chat_id": chat.chat_id,
                "username": username_for(ctx, session_id),
            }));

            let routes: &[&str] = match &chat.chat_id {
                Some(id) if id.starts_with(GROUP_PREFIX) => &["GROUP"],
                _ => &["SELF", "OTHERS"],
            };
            ctx.router
                .route_message(session_id, json!(chat), message, routes);
            Ok(Value::Null)
        }),
        false,
        None,
    )
}

/// `direct`: user-to-user message, resolved through the user↔session index.
fn direct_config() -> EventHandlerConfig {
    EventHandlerConfig::new(
        "direct",
        Arc::new(|session_id, payload, ctx| {
            let direct = match payload {
                EventPayload::Direct(direct) => direct,
                _ => {
                    return Err(AppError::Handler(
                        "direct handler got a non-direct payload".into(),
                    ))
                }
            };

            let message = message_map(json!({
                "event": "direct",
                "message": direct.message,
                "target_user_id": direct.to_user_id,
                "username": username_for(ctx, session_id),
            }));
            ctx.router
                .route_message(session_id, json!(direct), message, &["USER", "SELF"]);
            Ok(Value::Null)
        }),
        false,
        None,
    )
}

/// `set-username`: in-place presence update, confirmed on the sender's
/// private queue.
fn set_username_config() -> EventHandlerConfig {
    EventHandlerConfig::new(
        "set-username",
        Arc::new(|session_id, payload, ctx| {
            let update = match payload {
                EventPayload::SetUsername(update) => update,
                _ => {
                    return Err(AppError::Handler(
                        "set-username handler got an unexpected payload".into(),
                    ))
                }
            };

            if update.username.trim().is_empty() {
                return Err(AppError::Validation("username must not be empty".into()));
            }

            ctx.registry.set_username(session_id, &update.username);
            Ok(json!({
                "session_id": session_id,
                "username": update.username,
            }))
        }),
        false,
        Some("/user/queue/username".into()),
    )
}

/// `join-group`: membership in the group directory plus the session record.
fn join_group_config() -> EventHandlerConfig {
    EventHandlerConfig::new(
        "join-group",
        Arc::new(|session_id, payload, ctx| {
            let group = match payload {
                EventPayload::JoinGroup(group) => group,
                _ => {
                    return Err(AppError::Handler(
                        "join-group handler got an unexpected payload".into(),
                    ))
                }
            };

            if !group.group_id.starts_with(GROUP_PREFIX) {
                return Err(AppError::Validation(format!(
                    "'{}' is not a group id",
                    group.group_id
                )));
            }

            ctx.groups.join(&group.group_id, session_id);
            ctx.registry.join_group(session_id, &group.group_id);
            Ok(json!({
                "session_id": session_id,
                "group_id": group.group_id,
                "joined": true,
            }))
        }),
        false,
        Some("/user/queue/groups".into()),
    )
}

/// `leave-group`: reverse of `join-group`.
fn leave_group_config() -> EventHandlerConfig {
    EventHandlerConfig::new(
        "leave-group",
        Arc::new(|session_id, payload, ctx| {
            let group = match payload {
                EventPayload::LeaveGroup(group) => group,
                _ => {
                    return Err(AppError::Handler(
                        "leave-group handler got an unexpected payload".into(),
                    ))
                }
            };

            ctx.groups.leave(&group.group_id, session_id);
            ctx.registry.leave_group(session_id, &group.group_id);
            Ok(json!({
                "session_id": session_id,
                "group_id": group.group_id,
                "joined": false,
            }))
        }),
        false,
        Some("/user/queue/groups".into()),
    )
}

/// `typing`: transient indicator, never echoed back to the sender.
fn typing_config() -> EventHandlerConfig {
    EventHandlerConfig::new(
        "typing",
        Arc::new(|session_id, payload, ctx| {
            let typing = match payload {
                EventPayload::Typing(typing) => typing,
                _ => {
                    return Err(AppError::Handler(
                        "typing handler got an unexpected payload".into(),
                    ))
                }
            };

            let message = message_map(json!({
                "event": "typing",
                "chat_id": typing.chat_id,
                "username": username_for(ctx, session_id),
            }));

            let routes: &[&str] = match &typing.chat_id {
                Some(id) if id.starts_with(GROUP_PREFIX) => &["GROUP"],
                _ => &["OTHERS"],
            };
            ctx.router
                .route_message(session_id, Value::Null, message, routes);
            Ok(Value::Null)
        }),
        false,
        None,
    )
}

/// `ping`: connectivity check answered on the sender's private queue.
fn ping_config() -> EventHandlerConfig {
    EventHandlerConfig::new(
        "ping",
        Arc::new(|_, _, _| Ok(json!({"reply": "pong"}))),
        false,
        Some("/user/queue/pong".into()),
    )
}
