//! WebSocket Connection Handler
//!
//! One task pair per connection: the socket loop feeds inbound fragments
//! through the frame assembler and queues complete frames onto a bounded
//! per-connection dispatch worker, while a sender task drains the session's
//! outbound channel back to the socket.
//!
//! The dispatch worker preserves per-session ordering and decouples slow
//! handlers from frame reception. A full queue stalls only this connection's
//! reads, never other connections'.

use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::envelope::InboundFrame;
use crate::startup::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    ws.max_message_size(state.settings.websocket.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, addr, user_agent, state))
}

async fn handle_socket(socket: WebSocket, addr: SocketAddr, user_agent: String, state: AppState) {
    let session_id = Uuid::new_v4().to_string();

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.gateway.register(&session_id, tx);
    state
        .registry
        .track(&session_id, &addr.ip().to_string(), &user_agent);

    // Pin the session to the least-loaded healthy instance; fall back to
    // round-robin when nothing is advertised healthy.
    let assigned = state
        .pool
        .least_loaded_server()
        .or_else(|| state.pool.next_server());
    if let Some(server) = assigned {
        state.affinity.assign(&session_id, &server.server_id);
    }

    // Forward outbound frames from the session channel to the socket
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to serialize outbound frame");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Bounded per-connection dispatch worker: frames are handled strictly in
    // arrival order, off the socket read path.
    let (dispatch_tx, mut dispatch_rx) =
        mpsc::channel::<InboundFrame>(state.settings.websocket.dispatch_queue_capacity);
    let worker_state = state.clone();
    let worker_session = session_id.clone();
    let dispatch_task = tokio::spawn(async move {
        while let Some(frame) = dispatch_rx.recv().await {
            worker_state.dispatch.dispatch(
                &frame.event,
                &worker_session,
                frame.data,
                &worker_state.dispatch_ctx,
            );
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Some(document) = state.assembler.feed(&session_id, &text) else {
                    continue;
                };
                match serde_json::from_str::<InboundFrame>(&document) {
                    Ok(frame) => {
                        // Applies backpressure to this connection's reads
                        // when the worker falls behind
                        if dispatch_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %err,
                            "Discarding frame that is not an event envelope"
                        );
                    }
                }
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(session_id = %session_id, "Connection closed by peer");
                break;
            }
            Ok(Message::Ping(_)) => {
                // Pong is handled automatically by axum
            }
            Err(err) => {
                tracing::debug!(session_id = %session_id, error = %err, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    // Cleanup: drop partial buffers, flip presence, release the channel and
    // the pool assignment
    drop(dispatch_tx);
    state.assembler.clear(&session_id);
    state.registry.untrack(&session_id);
    state.gateway.unregister(&session_id);
    state.affinity.remove(&session_id);
    dispatch_task.await.ok();
    sender_task.abort();
}
