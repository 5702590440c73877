//! End-to-end flows through the real component graph: gateway channels in,
//! frame assembly, dispatch, routing, and delivery back out on the gateway
//! channels. Only the socket itself is absent.

use serde_json::{json, Value};
use tokio::sync::mpsc;

use chat_relay::domain::envelope::{InboundFrame, OutboundFrame};

use crate::common::TestApp;

/// Register a live session: gateway channel plus presence record.
fn connect(app: &TestApp, session_id: &str) -> mpsc::UnboundedReceiver<OutboundFrame> {
    let (tx, rx) = mpsc::unbounded_channel();
    app.state.gateway.register(session_id, tx);
    app.state.registry.track(session_id, "127.0.0.1", "test-agent");
    rx
}

fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Vec<OutboundFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn chat_echoes_to_self_and_fans_out_to_others() {
    let app = TestApp::new();
    let mut rx_a = connect(&app, "a");
    let mut rx_b = connect(&app, "b");

    app.state
        .dispatch
        .dispatch("chat", "a", json!({"message": "hello"}), &app.state.dispatch_ctx);

    let a_frames = drain(&mut rx_a);
    let b_frames = drain(&mut rx_b);

    assert_eq!(a_frames.len(), 1);
    assert_eq!(a_frames[0].queue, "/user/queue/messages/self");
    assert_eq!(a_frames[0].event, "chat");
    assert_eq!(a_frames[0].data["message"], "hello");
    assert_eq!(a_frames[0].data["username"], "Anonymous");

    assert_eq!(b_frames.len(), 1);
    assert_eq!(b_frames[0].queue, "/user/queue/messages/others");
    assert_eq!(b_frames[0].data["message"], "hello");
}

#[tokio::test]
async fn direct_message_reaches_the_bound_user_session() {
    let app = TestApp::new();
    let mut rx_a = connect(&app, "a");
    let mut rx_b = connect(&app, "b");
    app.state.gateway.bind_user("u-bob", "b");

    app.state.dispatch.dispatch(
        "direct",
        "a",
        json!({"to_user_id": "u-bob", "message": "psst"}),
        &app.state.dispatch_ctx,
    );

    let a_frames = drain(&mut rx_a);
    let b_frames = drain(&mut rx_b);

    // Sender echo plus one delivery to the recipient, nothing else
    assert_eq!(a_frames.len(), 1);
    assert_eq!(a_frames[0].queue, "/user/queue/messages/self");
    assert_eq!(b_frames.len(), 1);
    assert_eq!(b_frames[0].queue, "/user/queue/messages/others");
    assert_eq!(b_frames[0].data["message"], "psst");
}

#[tokio::test]
async fn group_chat_only_reaches_members() {
    let app = TestApp::new();
    let mut rx_a = connect(&app, "a");
    let mut rx_b = connect(&app, "b");
    let mut rx_c = connect(&app, "c");

    for session in ["a", "b"] {
        app.state.dispatch.dispatch(
            "join-group",
            session,
            json!({"group_id": "group_7"}),
            &app.state.dispatch_ctx,
        );
    }
    drain(&mut rx_a);
    drain(&mut rx_b);

    app.state.dispatch.dispatch(
        "chat",
        "a",
        json!({"message": "members only", "chat_id": "group_7"}),
        &app.state.dispatch_ctx,
    );

    assert_eq!(drain(&mut rx_a).len(), 1);
    assert_eq!(drain(&mut rx_b).len(), 1);
    assert!(drain(&mut rx_c).is_empty());
}

#[tokio::test]
async fn ping_answers_on_the_private_queue() {
    let app = TestApp::new();
    let mut rx_a = connect(&app, "a");

    app.state
        .dispatch
        .dispatch("ping", "a", Value::Null, &app.state.dispatch_ctx);

    let frames = drain(&mut rx_a);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].queue, "/user/queue/pong");
    assert_eq!(frames[0].data, json!({"reply": "pong"}));
}

#[tokio::test]
async fn handler_failure_becomes_an_error_envelope_for_the_sender_only() {
    let app = TestApp::new();
    let mut rx_a = connect(&app, "a");
    let mut rx_b = connect(&app, "b");

    app.state.dispatch.dispatch(
        "set-username",
        "a",
        json!({"username": "   "}),
        &app.state.dispatch_ctx,
    );

    let a_frames = drain(&mut rx_a);
    assert_eq!(a_frames.len(), 1);
    assert_eq!(a_frames[0].queue, "/user/queue/errors");
    assert_eq!(a_frames[0].event, "error");
    assert!(drain(&mut rx_b).is_empty());

    // The failed update left the record untouched
    assert_eq!(app.state.registry.get("a").unwrap().username, "Anonymous");
}

#[tokio::test]
async fn unknown_events_are_dropped_silently() {
    let app = TestApp::new();
    let mut rx_a = connect(&app, "a");

    app.state
        .dispatch
        .dispatch("bogus", "a", json!({}), &app.state.dispatch_ctx);

    assert!(drain(&mut rx_a).is_empty());
}

#[tokio::test]
async fn fragmented_frames_assemble_before_dispatch() {
    let app = TestApp::new();
    let mut rx_a = connect(&app, "a");
    let mut rx_b = connect(&app, "b");

    // Two physical writes carrying one logical frame
    assert!(app
        .state
        .assembler
        .feed("a", r#"{"event":"chat","data""#)
        .is_none());
    let document = app
        .state
        .assembler
        .feed("a", r#":{"message":"split"}}"#)
        .expect("frame should be complete");

    let frame: InboundFrame = serde_json::from_str(&document).unwrap();
    app.state
        .dispatch
        .dispatch(&frame.event, "a", frame.data, &app.state.dispatch_ctx);

    assert_eq!(drain(&mut rx_a).len(), 1);
    let b_frames = drain(&mut rx_b);
    assert_eq!(b_frames.len(), 1);
    assert_eq!(b_frames[0].data["message"], "split");
}

#[tokio::test]
async fn disconnect_keeps_the_record_but_stops_delivery() {
    let app = TestApp::new();
    let mut rx_a = connect(&app, "a");
    let mut rx_b = connect(&app, "b");

    app.state.registry.untrack("b");
    app.state.gateway.unregister("b");

    app.state
        .dispatch
        .dispatch("chat", "a", json!({"message": "hi"}), &app.state.dispatch_ctx);

    assert_eq!(drain(&mut rx_a).len(), 1);
    assert!(drain(&mut rx_b).is_empty());

    // Presence history survives the disconnect
    let record = app.state.registry.get("b").unwrap();
    assert!(!record.is_connected);
    assert!(record.disconnected_at.is_some());
    assert_eq!(app.state.registry.count(), 2);
}
