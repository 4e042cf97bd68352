use super::*;
use bytes::Bytes;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn configured() -> (Client<MemoryAdapter>, MemoryHandle) {
    let (adapter, handle) = MemoryAdapter::new();
    let mut client = Client::new(adapter);
    client
        .configure(ClientConfig::new("acct", 42).with_user_type(2))
        .expect("configure");
    (client, handle)
}

fn recorder() -> (Rc<RefCell<Vec<Message>>>, Callback) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let callback: Callback = Box::new(move |message: &Message| sink.borrow_mut().push(message.clone()));
    (seen, callback)
}

#[test]
fn configure_sets_identity_and_forwards_passthrough_fields() {
    let (adapter, handle) = MemoryAdapter::new();
    let mut client = Client::new(adapter);
    assert_eq!(client.identity(), &Identity::default());

    let config = ClientConfig::new("acct", "user-7").with_field("clientVersion", "1.2.0");
    client.configure(config.clone()).expect("configure");

    assert_eq!(client.identity().account_name, "acct");
    assert_eq!(client.identity().user_id, UserId::Text("user-7".into()));
    assert_eq!(client.identity().user_type, 0);
    let forwarded = handle.config().expect("forwarded");
    assert_eq!(forwarded, config);
    assert_eq!(forwarded.extra.get("clientVersion"), Some(&json!("1.2.0")));
}

#[test]
fn channel_names_use_the_configured_account() {
    let (client, _handle) = configured();
    assert_eq!(client.message("chat").as_str(), "message:/acct/chat");
    assert_eq!(client.presence("room").as_str(), "presence:/acct/room");
    assert_eq!(client.status("x/y").as_str(), "status:/acct/x/y");
}

#[test]
fn set_stamps_user_identity() {
    let (mut client, handle) = configured();
    let scope = client.status("mood");
    client.set(&scope, "happy", None).expect("set");

    let sent = handle.last_sent().expect("decode").expect("frame");
    assert_eq!(sent.op, Op::Set);
    assert_eq!(sent.to.as_deref(), Some("status:/acct/mood"));
    assert_eq!(sent.value, Some(json!("happy")));
    assert_eq!(sent.key, Some(json!(42)));
    assert_eq!(sent.user_type, Some(2));
    assert_eq!(sent.ack, None);
}

#[test]
fn outgoing_frames_match_wire_shape() {
    let (mut client, handle) = configured();
    client.publish("message:/acct/chat", json!({"text": "hi"}), None).expect("publish");
    client.subscribe("presence:/acct/room", None).expect("subscribe");
    client.get("status:/acct/x", None).expect("get");

    let frames: Vec<serde_json::Value> = handle
        .sent_frames()
        .iter()
        .map(|frame| serde_json::from_slice(frame).expect("json"))
        .collect();
    assert_eq!(
        frames,
        vec![
            json!({"op": "publish", "to": "message:/acct/chat", "value": {"text": "hi"}}),
            json!({"op": "subscribe", "to": "presence:/acct/room"}),
            json!({"op": "get", "to": "status:/acct/x"}),
        ]
    );
}

#[test]
fn get_and_sync_never_carry_ack_ids() {
    let (mut client, handle) = configured();
    let (_seen, first) = recorder();
    let (_seen2, second) = recorder();
    client.get("status:/acct/x", Some(first)).expect("get");
    client.sync("message:/acct/chat", Some(second)).expect("sync");
    for message in handle.sent_messages().expect("decode") {
        assert_eq!(message.ack, None);
    }
    assert_eq!(client.pending_waiters(), 2);
}

#[test]
fn failed_send_leaves_no_waiter_and_skips_the_id() {
    let (mut client, handle) = configured();
    let (seen, callback) = recorder();
    handle.fail_next_send("link down");
    let err = client
        .publish("message:/acct/chat", 1, Some(callback))
        .expect_err("send fails");
    assert!(matches!(err, Error::Transport { operation: "send", .. }));
    assert_eq!(client.pending_waiters(), 0);

    let (_seen, callback) = recorder();
    client
        .publish("message:/acct/chat", 2, Some(callback))
        .expect("publish");
    let sent = handle.last_sent().expect("decode").expect("frame");
    assert_eq!(sent.ack, Some(2));

    client.handle_frame(br#"{"op":"ack","value":1}"#).expect("stray ack");
    assert!(seen.borrow().is_empty());
    assert_eq!(client.stats().frames_out, 1);
}

#[test]
fn failed_connect_rolls_back_allocation() {
    let (adapter, handle) = MemoryAdapter::new();
    let mut client = Client::new(adapter);
    handle.fail_next_connect("refused");
    let err = client.alloc("widget", None).map(|_| ()).expect_err("connect fails");
    assert!(matches!(err, Error::Transport { operation: "connect", .. }));
    assert!(!client.is_allocated("widget"));
    assert_eq!(client.consumer_count(), 0);

    client.alloc("widget", None).expect("retry");
    assert_eq!(handle.connect_count(), 1);
    assert!(client.is_allocated("widget"));
}

#[test]
fn ready_event_fires_callbacks_and_closed_clears_readiness() {
    let (mut client, _handle) = configured();
    let fired = Rc::new(RefCell::new(0));
    let counter = fired.clone();
    client
        .alloc("widget", Some(Box::new(move || *counter.borrow_mut() += 1)))
        .expect("alloc");
    assert!(!client.is_ready());

    client.handle_event(TransportEvent::Ready).expect("ready");
    assert!(client.is_ready());
    assert_eq!(*fired.borrow(), 1);

    client.handle_event(TransportEvent::Closed).expect("closed");
    assert!(!client.is_ready());
    client.handle_event(TransportEvent::Ready).expect("ready again");
    assert_eq!(*fired.borrow(), 1);

    let late = Rc::new(RefCell::new(false));
    let flag = late.clone();
    client
        .alloc("other", Some(Box::new(move || *flag.borrow_mut() = true)))
        .expect("alloc");
    assert!(*late.borrow());
}

#[test]
fn channel_listeners_receive_pushes_until_removed() {
    let (mut client, _handle) = configured();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let channel = client.presence("room");
    let id = client.on(&channel, move |message: &Message| {
        sink.borrow_mut().push(message.op.clone())
    });

    let push = Message::new(Op::Online, channel.as_str()).with_value(json!({"100": 0}));
    let frame = push.encode().expect("encode");
    client
        .handle_event(TransportEvent::Frame(frame.clone()))
        .expect("online");
    assert!(client.off(id));
    client.handle_event(TransportEvent::Frame(frame)).expect("online");
    assert_eq!(seen.borrow().as_slice(), &[Op::Online]);
}

#[test]
fn frames_without_destination_are_counted_and_ignored() {
    let (mut client, _handle) = configured();
    client
        .handle_frame(br#"{"op":"publish","value":1}"#)
        .expect("unaddressed");
    assert_eq!(client.stats().unaddressed, 1);
    assert_eq!(client.stats().frames_in, 1);
}

#[test]
fn decode_failures_are_returned_and_counted() {
    let (mut client, _handle) = configured();
    let err = client
        .handle_event(TransportEvent::Frame(Bytes::from_static(b"not json")))
        .expect_err("garbage");
    assert!(err.is_parse_failure());
    let err = client
        .handle_frame(br#"{"to":"message:/acct/chat"}"#)
        .expect_err("missing op");
    assert!(err.is_parse_failure());
    assert_eq!(client.stats().decode_errors, 2);
}

#[test]
fn frame_cap_comes_from_engine_options() {
    let (adapter, _handle) = MemoryAdapter::new();
    let options = EngineOptions {
        max_frame_bytes: 16,
        log_payloads: true,
    };
    let mut client = Client::with_options(adapter, options);
    let err = client
        .handle_frame(br#"{"op":"publish","to":"message:/acct/chat","value":1}"#)
        .expect_err("too large");
    assert!(matches!(
        err,
        Error::Wire(radar_wire::Error::FrameTooLarge { limit: 16, .. })
    ));
}

#[test]
fn adapter_is_reachable_through_the_client() {
    let (mut client, handle) = configured();
    client.alloc("widget", None).expect("alloc");
    client.adapter_mut().send(Bytes::from_static(b"{}")).expect("raw send");
    assert_eq!(handle.sent_frames().len(), 1);
    assert_eq!(client.stats().frames_out, 0);
    let _ = client.adapter();
}
