// Console demo that drives the client engine against a scripted in-memory peer.
use anyhow::{Context, Result};
use radar_client::observability::init_tracing;
use radar_client::{
    Client, ClientConfig, EngineOptions, MemoryAdapter, MemoryHandle, Message, Op, TransportEvent,
};
use radar_wire::{SyncBatch, SyncEntry};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

fn main() -> Result<()> {
    init_tracing("info");
    println!("== Radar Client Demo ==");
    println!("Goal: show shared connection lifecycle, ack correlation, and sync replay.");

    println!("Step 1/5: configuring identity and allocating two consumers.");
    let config = ClientConfig::from_env_or_yaml(None).context("load client config")?;
    let config = if config.account_name.is_empty() {
        ClientConfig::new("demo", 100)
    } else {
        config
    };
    let (adapter, handle) = MemoryAdapter::new();
    let mut peer = Peer::new(handle.clone());
    let mut client = Client::with_options(adapter, EngineOptions::from_env());
    client.configure(config)?;
    client
        .alloc(
            "status-widget",
            Some(Box::new(|| println!("  ready callback fired"))),
        )?
        .alloc("chat-widget", None)?;
    println!(
        "  consumers={} connects={}",
        client.consumer_count(),
        handle.connect_count()
    );
    client.handle_event(TransportEvent::Ready)?;

    println!("Step 2/5: writing status with an ack callback.");
    let status = client.status("mood");
    client.set(
        &status,
        "focused",
        Some(Box::new(|original: &Message| {
            println!("  ack received for {} (id {:?})", original.op, original.ack);
        })),
    )?;
    peer.answer(&mut client)?;

    println!("Step 3/5: reading status back.");
    client.get(
        &status,
        Some(Box::new(|reply: &Message| {
            println!("  get reply: {}", reply.value.clone().unwrap_or_default());
        })),
    )?;
    peer.answer(&mut client)?;

    println!("Step 4/5: replaying chat history twice.");
    let chat = client.message("lobby");
    let replayed = Rc::new(RefCell::new(0));
    let counter = replayed.clone();
    client.on(&chat, move |message: &Message| {
        *counter.borrow_mut() += 1;
        println!("  chat: {}", message.value.clone().unwrap_or_default());
    });
    let history = SyncBatch {
        channel: chat.to_string(),
        time: 30,
        entries: vec![
            SyncEntry {
                message: Message::new(Op::Publish, chat.as_str()).with_value("hello"),
                time: 10,
            },
            SyncEntry {
                message: Message::new(Op::Publish, chat.as_str()).with_value("again"),
                time: 20,
            },
        ],
    }
    .to_message()?;
    for _ in 0..2 {
        client.handle_frame(&history.encode()?)?;
    }
    println!(
        "  replayed={} watermark={:?}",
        replayed.borrow(),
        client.watermark(&chat)
    );

    println!("Step 5/5: releasing consumers.");
    client.dealloc("status-widget")?;
    client.dealloc("chat-widget")?;
    println!(
        "  connected={} stats={:?}",
        handle.is_connected(),
        client.stats()
    );
    Ok(())
}

// Plays the server: acks every write that asked for one and answers reads
// with the last value written.
struct Peer {
    handle: MemoryHandle,
    status: Value,
}

impl Peer {
    fn new(handle: MemoryHandle) -> Self {
        Self {
            handle,
            status: Value::Null,
        }
    }

    fn answer(&mut self, client: &mut Client<MemoryAdapter>) -> Result<()> {
        for frame in self.handle.take_sent() {
            let request = Message::decode(&frame)?;
            let reply = match request.op {
                Op::Set => {
                    self.status = request.value.clone().unwrap_or_default();
                    request.ack.map(Message::ack)
                }
                Op::Get => request
                    .to
                    .as_deref()
                    .map(|to| Message::new(Op::Get, to).with_value(self.status.clone())),
                _ => request.ack.map(Message::ack),
            };
            if let Some(reply) = reply {
                client.handle_event(TransportEvent::Frame(reply.encode()?))?;
            }
        }
        Ok(())
    }
}
