// Request/reply correlation for outgoing messages.
use radar_wire::Message;

use crate::client::events::{Callback, Correlation, Waiter};

/// Hands out ack ids and builds the waiters that resolve them.
///
/// Ids start at 1 and only ever increase for the lifetime of a client, so two
/// pending writes can never share one.
pub(crate) struct AckCorrelator {
    next_id: u64,
}

impl Default for AckCorrelator {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl AckCorrelator {
    /// Stamps `message` with the next ack id and returns a waiter that calls
    /// `callback` with the stamped outgoing message once the server acks it.
    pub(crate) fn track_write(&mut self, message: &mut Message, callback: Callback) -> Waiter {
        let id = self.next_id;
        self.next_id += 1;
        message.ack = Some(id);
        let original = message.clone();
        Waiter::new(
            Correlation::AckId(id),
            Box::new(move |_ack: &Message| callback(&original)),
        )
    }

    /// Returns a waiter resolved by the first `get` reply addressed to `scope`;
    /// `callback` receives that reply.
    pub(crate) fn track_read(scope: &str, callback: Callback) -> Waiter {
        Waiter::new(Correlation::Scope(scope.to_string()), callback)
    }

    #[cfg(test)]
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }
}
