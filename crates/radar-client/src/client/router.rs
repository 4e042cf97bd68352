// Inbound frame decoding and classification by operation.
use radar_wire::{Message, Op};

use crate::client::events::EventKey;
use crate::error::Result;

/// Where an inbound message goes next.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Route {
    /// `ack`/`get` replies: offered to correlation waiters and reply listeners.
    Reply(EventKey, Message),
    /// History replay, handled by the sync batch processor.
    Sync(Message),
    /// Channel traffic fanned out to listeners of its destination.
    Channel(EventKey, Message),
    /// Channel traffic without a destination; nobody can be listening for it.
    Unaddressed(Message),
}

pub(crate) struct MessageRouter {
    max_frame_bytes: usize,
}

impl MessageRouter {
    pub(crate) fn new(max_frame_bytes: usize) -> Self {
        Self { max_frame_bytes }
    }

    /// Decodes one raw frame and classifies it. Decode failures are returned,
    /// never dropped.
    pub(crate) fn route(&self, payload: &[u8]) -> Result<Route> {
        let message = Message::decode_with_limit(payload, self.max_frame_bytes)?;
        Ok(classify(message))
    }
}

fn classify(message: Message) -> Route {
    match message.op {
        Op::Ack => Route::Reply(EventKey::Ack, message),
        Op::Get => Route::Reply(EventKey::Get, message),
        Op::Sync => Route::Sync(message),
        Op::Set
        | Op::Publish
        | Op::Subscribe
        | Op::Unsubscribe
        | Op::Online
        | Op::Offline
        | Op::Other(_) => {
            match message.to.as_deref() {
                Some(to) => Route::Channel(EventKey::channel(to), message),
                None => Route::Unaddressed(message),
            }
        }
    }
}
