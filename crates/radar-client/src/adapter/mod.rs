//! Boundary between the protocol engine and the transport that carries it.
//!
//! # Purpose
//! The engine never owns a socket. Connection sequencing, reconnection, and
//! handshakes belong to an [`Adapter`] injected at construction, which lets
//! tests swap in [`memory::MemoryAdapter`] instead of a real transport.
//!
//! # Inbound traffic
//! Whoever drives the adapter feeds what it receives back into the client, in
//! arrival order, as [`TransportEvent`]s via `Client::handle_event`.
use bytes::Bytes;

use crate::config::ClientConfig;

pub mod memory;

/// Outbound half of the transport contract.
///
/// Errors are opaque to the engine and surface as `Error::Transport`.
pub trait Adapter {
    /// Receives the full client configuration for handshake use.
    fn configure(&mut self, config: &ClientConfig) -> anyhow::Result<()>;

    /// Opens the shared connection. Only called when the first consumer is allocated.
    fn connect(&mut self) -> anyhow::Result<()>;

    /// Closes the shared connection. Only called when the last consumer is released.
    fn disconnect(&mut self) -> anyhow::Result<()>;

    /// Sends one serialized message.
    fn send(&mut self, payload: Bytes) -> anyhow::Result<()>;
}

impl<A: Adapter + ?Sized> Adapter for Box<A> {
    fn configure(&mut self, config: &ClientConfig) -> anyhow::Result<()> {
        (**self).configure(config)
    }

    fn connect(&mut self) -> anyhow::Result<()> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> anyhow::Result<()> {
        (**self).disconnect()
    }

    fn send(&mut self, payload: Bytes) -> anyhow::Result<()> {
        (**self).send(payload)
    }
}

/// Inbound half of the transport contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection setup, including any identity handshake, has completed.
    Ready,
    /// One raw frame as received from the server.
    Frame(Bytes),
    /// The connection dropped; the adapter may reconnect and signal `Ready` again.
    Closed,
}
