// Reference counting of named consumers sharing the one connection.
use std::collections::HashSet;

/// Callback fired once the shared connection reports ready.
pub type ReadyCallback = Box<dyn FnOnce()>;

/// What the caller must do to the connection after a registry change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Open,
    Close,
    Unchanged,
}

/// Tracks which consumers hold the connection and whether it is ready.
///
/// Membership is by name only: allocating a name that is already present is
/// a no-op, and one `release` removes it regardless of how often it was
/// allocated.
#[derive(Default)]
pub(crate) struct AllocationRegistry {
    consumers: HashSet<String>,
    ready: bool,
    on_ready: Vec<ReadyCallback>,
}

impl AllocationRegistry {
    pub(crate) fn acquire(&mut self, name: &str) -> Transition {
        let was_empty = self.consumers.is_empty();
        if !self.consumers.insert(name.to_string()) {
            return Transition::Unchanged;
        }
        if was_empty {
            Transition::Open
        } else {
            Transition::Unchanged
        }
    }

    // Undo an acquire whose connect failed so the set stays in step with the connection.
    pub(crate) fn rollback(&mut self, name: &str) {
        self.consumers.remove(name);
    }

    pub(crate) fn release(&mut self, name: &str) -> Transition {
        if !self.consumers.remove(name) {
            return Transition::Unchanged;
        }
        if self.consumers.is_empty() {
            // Callbacks belong to consumers that are all gone now.
            self.ready = false;
            self.on_ready.clear();
            Transition::Close
        } else {
            Transition::Unchanged
        }
    }

    /// Queues `callback` for the next ready signal, or runs it now if the
    /// connection is already ready.
    pub(crate) fn when_ready(&mut self, callback: ReadyCallback) {
        if self.ready {
            callback();
        } else {
            self.on_ready.push(callback);
        }
    }

    /// Marks the connection ready and returns the callbacks to fire.
    pub(crate) fn mark_ready(&mut self) -> Vec<ReadyCallback> {
        self.ready = true;
        std::mem::take(&mut self.on_ready)
    }

    pub(crate) fn mark_closed(&mut self) {
        self.ready = false;
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.consumers.contains(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.consumers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn first_acquire_opens_and_last_release_closes() {
        let mut registry = AllocationRegistry::default();
        assert_eq!(registry.acquire("a"), Transition::Open);
        assert_eq!(registry.acquire("b"), Transition::Unchanged);
        assert_eq!(registry.release("a"), Transition::Unchanged);
        assert_eq!(registry.release("b"), Transition::Close);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn reacquiring_a_name_is_idempotent() {
        let mut registry = AllocationRegistry::default();
        assert_eq!(registry.acquire("a"), Transition::Open);
        assert_eq!(registry.acquire("a"), Transition::Unchanged);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.release("a"), Transition::Close);
    }

    #[test]
    fn releasing_unknown_name_changes_nothing() {
        let mut registry = AllocationRegistry::default();
        assert_eq!(registry.release("ghost"), Transition::Unchanged);
        registry.acquire("a");
        assert_eq!(registry.release("ghost"), Transition::Unchanged);
        assert!(registry.contains("a"));
    }

    #[test]
    fn ready_callbacks_fire_once() {
        let mut registry = AllocationRegistry::default();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        registry.when_ready(Box::new(move || counter.set(counter.get() + 1)));

        for callback in registry.mark_ready() {
            callback();
        }
        assert!(registry.mark_ready().is_empty());
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn when_ready_runs_immediately_if_already_ready() {
        let mut registry = AllocationRegistry::default();
        registry.acquire("a");
        registry.mark_ready();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        registry.when_ready(Box::new(move || flag.set(true)));
        assert!(fired.get());
    }

    #[test]
    fn close_drops_queued_ready_callbacks() {
        let mut registry = AllocationRegistry::default();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        registry.acquire("a");
        registry.when_ready(Box::new(move || flag.set(true)));
        assert_eq!(registry.release("a"), Transition::Close);

        registry.acquire("b");
        for callback in registry.mark_ready() {
            callback();
        }
        assert!(!fired.get());
    }

    #[test]
    fn close_clears_readiness() {
        let mut registry = AllocationRegistry::default();
        registry.acquire("a");
        registry.mark_ready();
        registry.release("a");
        assert!(!registry.is_ready());

        registry.acquire("a");
        registry.mark_ready();
        registry.mark_closed();
        assert!(!registry.is_ready());
    }
}
