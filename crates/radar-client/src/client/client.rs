//! Public client surface over an injected transport adapter.
//!
//! # Purpose
//! Composes consumer allocation, request/reply correlation, sync replay, and
//! inbound routing behind one owned value. Everything runs on the caller's
//! thread: outbound calls return once the adapter accepted the frame, and
//! inbound traffic is pushed in through [`Client::handle_event`].
//!
//! # Callbacks
//! Reply callbacks and listeners only ever see the message that triggered
//! them; they cannot reach back into the client. Work that needs the client
//! (for example, chaining a `get` after an ack) belongs to the caller's loop,
//! or to an awaited [`oneshot_callback`](crate::client::reply::oneshot_callback).
use radar_common::{ChannelKind, ChannelName, Identity};
use radar_wire::{Message, Op};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::adapter::{Adapter, TransportEvent};
use crate::client::ack::AckCorrelator;
use crate::client::allocation::{AllocationRegistry, ReadyCallback, Transition};
use crate::client::events::{Callback, EventBus, EventKey, ListenerId};
use crate::client::router::{MessageRouter, Route};
use crate::client::sync_batch::SyncBatchProcessor;
use crate::config::{ClientConfig, EngineOptions};
use crate::counters::ClientStats;
use crate::error::{Error, Result};

/// Protocol engine for one logical user over one shared connection.
pub struct Client<A: Adapter> {
    adapter: A,
    identity: Identity,
    options: EngineOptions,
    registry: AllocationRegistry,
    acks: AckCorrelator,
    sync: SyncBatchProcessor,
    router: MessageRouter,
    events: EventBus,
    stats: ClientStats,
}

impl<A: Adapter> Client<A> {
    pub fn new(adapter: A) -> Self {
        Self::with_options(adapter, EngineOptions::default())
    }

    pub fn with_options(adapter: A, options: EngineOptions) -> Self {
        Self {
            adapter,
            identity: Identity::default(),
            options,
            registry: AllocationRegistry::default(),
            acks: AckCorrelator::default(),
            sync: SyncBatchProcessor::default(),
            router: MessageRouter::new(options.max_frame_bytes),
            events: EventBus::default(),
            stats: ClientStats::default(),
        }
    }

    /// Sets the local identity and hands the full configuration, passthrough
    /// fields included, to the adapter.
    ///
    /// The identity is left unchanged if the adapter rejects the configuration.
    pub fn configure(&mut self, config: ClientConfig) -> Result<&mut Self> {
        self.adapter
            .configure(&config)
            .map_err(Error::transport("configure"))?;
        self.identity = config.identity();
        debug!(
            account = %self.identity.account_name,
            user_id = %self.identity.user_id,
            user_type = self.identity.user_type,
            "client configured"
        );
        Ok(self)
    }

    /// Registers consumer `name`, opening the connection if it is the first.
    ///
    /// `on_ready` fires once the connection reports ready, or right away if it
    /// already has. When the connect fails the registration is undone.
    pub fn alloc(&mut self, name: &str, on_ready: Option<ReadyCallback>) -> Result<&mut Self> {
        if self.registry.acquire(name) == Transition::Open {
            debug!(user_id = %self.identity.user_id, consumer = name, "connecting");
            if let Err(err) = self.adapter.connect() {
                self.registry.rollback(name);
                return Err(Error::transport("connect")(err));
            }
        }
        debug!(
            consumer = name,
            consumers = self.registry.len(),
            "consumer allocated"
        );
        if let Some(callback) = on_ready {
            self.registry.when_ready(callback);
        }
        Ok(self)
    }

    /// Releases consumer `name`, closing the connection if it was the last.
    pub fn dealloc(&mut self, name: &str) -> Result<()> {
        if self.registry.release(name) == Transition::Close {
            debug!(user_id = %self.identity.user_id, consumer = name, "disconnecting");
            self.adapter
                .disconnect()
                .map_err(Error::transport("disconnect"))?;
        }
        Ok(())
    }

    /// Writes `value` to a status channel, tagged with the local user.
    pub fn set(
        &mut self,
        scope: impl AsRef<str>,
        value: impl Into<Value>,
        callback: Option<Callback>,
    ) -> Result<()> {
        let message = Message::new(Op::Set, scope.as_ref())
            .with_value(value)
            .with_key(self.identity.user_id.to_json())
            .with_user_type(self.identity.user_type);
        self.write(message, callback)
    }

    pub fn publish(
        &mut self,
        scope: impl AsRef<str>,
        value: impl Into<Value>,
        callback: Option<Callback>,
    ) -> Result<()> {
        let message = Message::new(Op::Publish, scope.as_ref()).with_value(value);
        self.write(message, callback)
    }

    pub fn subscribe(&mut self, scope: impl AsRef<str>, callback: Option<Callback>) -> Result<()> {
        self.write(Message::new(Op::Subscribe, scope.as_ref()), callback)
    }

    pub fn unsubscribe(&mut self, scope: impl AsRef<str>, callback: Option<Callback>) -> Result<()> {
        self.write(Message::new(Op::Unsubscribe, scope.as_ref()), callback)
    }

    /// Requests the current state of `scope`; `callback` receives the reply.
    pub fn get(&mut self, scope: impl AsRef<str>, callback: Option<Callback>) -> Result<()> {
        self.request(Op::Get, scope.as_ref(), callback)
    }

    /// Requests the history of `scope`. Updates are replayed to the channel's
    /// listeners; `callback` receives the server's `get` reply.
    pub fn sync(&mut self, scope: impl AsRef<str>, callback: Option<Callback>) -> Result<()> {
        self.request(Op::Sync, scope.as_ref(), callback)
    }

    pub fn message(&self, scope: &str) -> ChannelName {
        self.identity.channel(ChannelKind::Message, scope)
    }

    pub fn presence(&self, scope: &str) -> ChannelName {
        self.identity.channel(ChannelKind::Presence, scope)
    }

    pub fn status(&self, scope: &str) -> ChannelName {
        self.identity.channel(ChannelKind::Status, scope)
    }

    /// Adds a listener for every message delivered on `key`.
    pub fn on(
        &mut self,
        key: impl Into<EventKey>,
        listener: impl FnMut(&Message) + 'static,
    ) -> ListenerId {
        self.events.on(key.into(), Box::new(listener))
    }

    /// Removes a listener; returns false if it was already gone.
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub fn handle_event(&mut self, event: TransportEvent) -> Result<()> {
        match event {
            TransportEvent::Ready => {
                self.handle_ready();
                Ok(())
            }
            TransportEvent::Frame(payload) => self.handle_frame(&payload),
            TransportEvent::Closed => {
                debug!(user_id = %self.identity.user_id, "connection closed");
                self.registry.mark_closed();
                Ok(())
            }
        }
    }

    pub fn handle_ready(&mut self) {
        let callbacks = self.registry.mark_ready();
        debug!(
            user_id = %self.identity.user_id,
            callbacks = callbacks.len(),
            "connection ready"
        );
        for callback in callbacks {
            callback();
        }
    }

    /// Decodes and dispatches one inbound frame.
    ///
    /// A frame that cannot be parsed, including a sync frame with a bad entry,
    /// is returned as an error and has no other effect.
    pub fn handle_frame(&mut self, payload: &[u8]) -> Result<()> {
        self.stats.record_frame_in();
        if self.options.log_payloads {
            trace!(
                user_id = %self.identity.user_id,
                payload = %String::from_utf8_lossy(payload),
                "frame in"
            );
        }
        let route = match self.router.route(payload) {
            Ok(route) => route,
            Err(err) => {
                self.stats.record_decode_error();
                warn!(user_id = %self.identity.user_id, error = %err, "rejecting undecodable frame");
                return Err(err);
            }
        };
        match route {
            Route::Reply(key, message) => {
                trace!(user_id = %self.identity.user_id, op = %message.op, to = ?message.to, "reply");
                let delivery = self.events.emit(&key, &message);
                if key == EventKey::Ack {
                    self.stats.record_acks(delivery.resolved);
                } else {
                    self.stats.record_replies(delivery.resolved);
                }
                self.stats.record_pending_waiters(self.events.pending_waiters());
            }
            Route::Sync(message) => self.replay(&message)?,
            Route::Channel(key, message) => {
                let delivery = self.events.emit(&key, &message);
                trace!(
                    user_id = %self.identity.user_id,
                    op = %message.op,
                    to = ?message.to,
                    listeners = delivery.listeners,
                    "channel message"
                );
            }
            Route::Unaddressed(message) => {
                debug!(op = %message.op, "ignoring frame without destination");
                self.stats.record_unaddressed();
            }
        }
        Ok(())
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_allocated(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn consumer_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }

    /// Newest update time seen on `channel`, if any sync frame reached it.
    pub fn watermark(&self, channel: impl AsRef<str>) -> Option<u64> {
        self.sync.watermark(channel.as_ref())
    }

    pub fn pending_waiters(&self) -> usize {
        self.events.pending_waiters()
    }

    pub fn stats(&self) -> ClientStats {
        self.stats
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    // Writes carry an ack id only when someone is waiting for the ack.
    fn write(&mut self, mut message: Message, callback: Option<Callback>) -> Result<()> {
        let waiter = callback.map(|callback| self.acks.track_write(&mut message, callback));
        self.send(&message)?;
        if let Some(waiter) = waiter {
            self.events.when(waiter);
            self.stats.record_pending_waiters(self.events.pending_waiters());
        }
        Ok(())
    }

    // Reads are answered by a `get` reply addressed to the requested scope.
    fn request(&mut self, op: Op, scope: &str, callback: Option<Callback>) -> Result<()> {
        self.send(&Message::new(op, scope))?;
        if let Some(callback) = callback {
            self.events.when(AckCorrelator::track_read(scope, callback));
            self.stats.record_pending_waiters(self.events.pending_waiters());
        }
        Ok(())
    }

    fn send(&mut self, message: &Message) -> Result<()> {
        let payload = message.encode()?;
        if self.options.log_payloads {
            trace!(
                user_id = %self.identity.user_id,
                payload = %String::from_utf8_lossy(&payload),
                "frame out"
            );
        } else {
            trace!(
                user_id = %self.identity.user_id,
                op = %message.op,
                to = ?message.to,
                ack = ?message.ack,
                "frame out"
            );
        }
        self.adapter
            .send(payload)
            .map_err(Error::transport("send"))?;
        self.stats.record_frame_out();
        Ok(())
    }

    fn replay(&mut self, frame: &Message) -> Result<()> {
        let replay = match self.sync.process(frame) {
            Ok(Some(replay)) => replay,
            Ok(None) => {
                debug!(to = ?frame.to, "ignoring incomplete sync frame");
                return Ok(());
            }
            Err(err) => {
                self.stats.record_decode_error();
                warn!(user_id = %self.identity.user_id, to = ?frame.to, error = %err, "rejecting malformed sync frame");
                return Err(err);
            }
        };
        debug!(
            channel = %replay.channel,
            replayed = replay.updates.len(),
            suppressed = replay.suppressed,
            watermark = replay.watermark,
            "sync replay"
        );
        let key = EventKey::channel(&replay.channel);
        for update in &replay.updates {
            self.events.emit(&key, update);
        }
        self.stats.record_sync(replay.updates.len(), replay.suppressed);
        Ok(())
    }
}
