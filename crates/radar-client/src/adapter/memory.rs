// In-process adapter that records traffic instead of touching the network.
use anyhow::Result;
use bytes::Bytes;
use radar_wire::Message;
use std::cell::RefCell;
use std::rc::Rc;

use crate::adapter::Adapter;
use crate::config::ClientConfig;

#[derive(Debug, Default)]
struct MemoryState {
    config: Option<ClientConfig>,
    connected: bool,
    connects: usize,
    disconnects: usize,
    sent: Vec<Bytes>,
    fail_next_send: Option<String>,
    fail_next_connect: Option<String>,
}

/// Adapter that keeps everything in memory.
///
/// The paired [`MemoryHandle`] stays with the test or demo so it can inspect
/// what the client did after the adapter has been moved into it.
///
/// ```
/// use radar_client::{Client, MemoryAdapter};
///
/// let (adapter, handle) = MemoryAdapter::new();
/// let mut client = Client::new(adapter);
/// client.alloc("widget", None).expect("alloc");
/// assert_eq!(handle.connect_count(), 1);
/// assert!(handle.is_connected());
/// ```
#[derive(Debug)]
pub struct MemoryAdapter {
    state: Rc<RefCell<MemoryState>>,
}

/// Inspection side of a [`MemoryAdapter`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryAdapter {
    pub fn new() -> (Self, MemoryHandle) {
        let state = Rc::new(RefCell::new(MemoryState::default()));
        (
            Self {
                state: state.clone(),
            },
            MemoryHandle { state },
        )
    }
}

impl Adapter for MemoryAdapter {
    fn configure(&mut self, config: &ClientConfig) -> Result<()> {
        self.state.borrow_mut().config = Some(config.clone());
        Ok(())
    }

    fn connect(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(reason) = state.fail_next_connect.take() {
            return Err(anyhow::anyhow!(reason));
        }
        state.connects += 1;
        state.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.disconnects += 1;
        state.connected = false;
        Ok(())
    }

    fn send(&mut self, payload: Bytes) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(reason) = state.fail_next_send.take() {
            return Err(anyhow::anyhow!(reason));
        }
        state.sent.push(payload);
        Ok(())
    }
}

impl MemoryHandle {
    pub fn config(&self) -> Option<ClientConfig> {
        self.state.borrow().config.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn connect_count(&self) -> usize {
        self.state.borrow().connects
    }

    pub fn disconnect_count(&self) -> usize {
        self.state.borrow().disconnects
    }

    pub fn sent_frames(&self) -> Vec<Bytes> {
        self.state.borrow().sent.clone()
    }

    // Decode everything sent so far; frames were produced by the client so they must parse.
    pub fn sent_messages(&self) -> Result<Vec<Message>> {
        self.state
            .borrow()
            .sent
            .iter()
            .map(|frame| Message::decode(frame).map_err(Into::into))
            .collect()
    }

    pub fn last_sent(&self) -> Result<Option<Message>> {
        let state = self.state.borrow();
        state
            .sent
            .last()
            .map(|frame| Message::decode(frame).map_err(Into::into))
            .transpose()
    }

    /// Drains recorded frames, returning them in send order.
    pub fn take_sent(&self) -> Vec<Bytes> {
        std::mem::take(&mut self.state.borrow_mut().sent)
    }

    pub fn fail_next_send(&self, reason: impl Into<String>) {
        self.state.borrow_mut().fail_next_send = Some(reason.into());
    }

    pub fn fail_next_connect(&self, reason: impl Into<String>) {
        self.state.borrow_mut().fail_next_connect = Some(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_wire::Op;

    #[test]
    fn records_lifecycle_and_frames() {
        let (mut adapter, handle) = MemoryAdapter::new();
        adapter.connect().expect("connect");
        let frame = Message::new(Op::Subscribe, "message:/a/b")
            .encode()
            .expect("encode");
        adapter.send(frame.clone()).expect("send");
        adapter.disconnect().expect("disconnect");

        assert_eq!(handle.connect_count(), 1);
        assert_eq!(handle.disconnect_count(), 1);
        assert!(!handle.is_connected());
        assert_eq!(handle.sent_frames(), vec![frame]);
        let last = handle.last_sent().expect("decode").expect("frame");
        assert_eq!(last.op, Op::Subscribe);
        assert_eq!(handle.take_sent().len(), 1);
        assert!(handle.sent_frames().is_empty());
    }

    #[test]
    fn injected_failures_fire_once() {
        let (mut adapter, handle) = MemoryAdapter::new();
        handle.fail_next_send("link down");
        let err = adapter.send(Bytes::from_static(b"{}")).expect_err("fail");
        assert_eq!(err.to_string(), "link down");
        adapter.send(Bytes::from_static(b"{}")).expect("second send");

        handle.fail_next_connect("refused");
        assert!(adapter.connect().is_err());
        adapter.connect().expect("second connect");
        assert_eq!(handle.connect_count(), 1);
    }
}
