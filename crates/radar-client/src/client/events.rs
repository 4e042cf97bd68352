// Per-event listeners and one-shot correlation waiters.
use radar_common::ChannelName;
use radar_wire::Message;
use std::collections::{HashMap, VecDeque};

/// Continuation fired once with the message that resolved a request.
pub type Callback = Box<dyn FnOnce(&Message)>;

type Listener = Box<dyn FnMut(&Message)>;

/// Name of an event messages are delivered on.
///
/// Replies and channel traffic live in separate variants so a channel can never
/// shadow the `ack`/`get` reply streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    Ack,
    Get,
    Channel(String),
}

impl EventKey {
    pub fn channel(name: impl AsRef<str>) -> Self {
        Self::Channel(name.as_ref().to_string())
    }
}

impl From<&ChannelName> for EventKey {
    fn from(name: &ChannelName) -> Self {
        Self::Channel(name.as_str().to_string())
    }
}

impl From<ChannelName> for EventKey {
    fn from(name: ChannelName) -> Self {
        Self::from(&name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What an inbound reply must carry to resolve a waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Correlation {
    // Writes: the ack echoes the id we stamped on the request.
    AckId(u64),
    // Reads: the server answers with the channel itself, not an id.
    Scope(String),
}

impl Correlation {
    fn event(&self) -> EventKey {
        match self {
            Self::AckId(_) => EventKey::Ack,
            Self::Scope(_) => EventKey::Get,
        }
    }

    fn matches(&self, message: &Message) -> bool {
        match self {
            Self::AckId(id) => message.acked_id() == Some(*id),
            Self::Scope(scope) => message.to.as_deref() == Some(scope.as_str()),
        }
    }
}

pub(crate) struct Waiter {
    correlation: Correlation,
    continuation: Callback,
}

impl Waiter {
    pub(crate) fn new(correlation: Correlation, continuation: Callback) -> Self {
        Self {
            correlation,
            continuation,
        }
    }

    #[cfg(test)]
    pub(crate) fn correlation(&self) -> &Correlation {
        &self.correlation
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Delivery {
    pub(crate) listeners: usize,
    pub(crate) resolved: usize,
}

#[derive(Default)]
pub(crate) struct EventBus {
    listeners: HashMap<EventKey, Vec<(ListenerId, Listener)>>,
    waiters: HashMap<EventKey, VecDeque<Waiter>>,
    next_listener: u64,
}

impl EventBus {
    pub(crate) fn on(&mut self, key: EventKey, listener: Listener) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.entry(key).or_default().push((id, listener));
        id
    }

    pub(crate) fn off(&mut self, id: ListenerId) -> bool {
        let mut removed = false;
        self.listeners.retain(|_, list| {
            let before = list.len();
            list.retain(|(listener_id, _)| *listener_id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    // Queue a waiter on the event its correlation listens to.
    pub(crate) fn when(&mut self, waiter: Waiter) {
        self.waiters
            .entry(waiter.correlation.event())
            .or_default()
            .push_back(waiter);
    }

    /// Delivers `message` to every listener on `key`, then offers it to the
    /// waiters queued on `key` in registration order. Each waiter whose
    /// correlation matches is fired and dropped; the rest stay queued.
    pub(crate) fn emit(&mut self, key: &EventKey, message: &Message) -> Delivery {
        let mut delivery = Delivery::default();
        if let Some(list) = self.listeners.get_mut(key) {
            for (_, listener) in list.iter_mut() {
                listener(message);
                delivery.listeners += 1;
            }
        }
        if let Some(queue) = self.waiters.get_mut(key) {
            let mut remaining = VecDeque::with_capacity(queue.len());
            while let Some(waiter) = queue.pop_front() {
                if waiter.correlation.matches(message) {
                    (waiter.continuation)(message);
                    delivery.resolved += 1;
                } else {
                    remaining.push_back(waiter);
                }
            }
            if remaining.is_empty() {
                self.waiters.remove(key);
            } else {
                *queue = remaining;
            }
        }
        delivery
    }

    pub(crate) fn pending_waiters(&self) -> usize {
        self.waiters.values().map(VecDeque::len).sum()
    }
}
