// Client protocol engine for the radar pub/sub service.
// The engine speaks the JSON message protocol but owns no socket: a transport
// adapter is injected at construction and inbound traffic is pushed back in.
//
// CLIENT-SIDE DESIGN INTENT
// -------------------------
// Everything happens on the caller's thread. An outbound call returns once the
// adapter has accepted the frame, and an inbound frame is fully dispatched
// (waiters resolved, listeners called, sync updates replayed) before
// `handle_frame` returns. Inbound frames must therefore be fed in arrival order.
//
// - One connection is shared by every named consumer. It opens on the first
//   `alloc` and closes when the last consumer is released.
// - Writes that pass a callback are stamped with a fresh ack id; reads are
//   answered by a `get` reply addressed to the requested channel.
// - Sync replays are deduplicated per channel by update time, so a repeated
//   history frame is invisible to listeners.
#[macro_use]
mod macros;

pub mod adapter;
pub mod client;
pub mod config;
pub mod counters;
pub mod error;
pub mod observability;

pub use adapter::memory::{MemoryAdapter, MemoryHandle};
pub use adapter::{Adapter, TransportEvent};
pub use client::allocation::ReadyCallback;
pub use client::client::Client;
pub use client::events::{Callback, EventKey, ListenerId};
pub use client::reply::oneshot_callback;
pub use config::{ClientConfig, EngineOptions};
pub use counters::ClientStats;
pub use error::{Error, Result};
pub use radar_common::ids::UserId;
pub use radar_common::{ChannelKind, ChannelName, Identity};
pub use radar_wire::{Message, Op};

#[cfg(test)]
mod tests;
