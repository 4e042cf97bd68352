// Bridge from callback-style replies to an awaitable receiver.
use radar_wire::Message;
use tokio::sync::oneshot;

use crate::client::events::Callback;

/// Returns a callback for `set`/`get`/... together with a receiver that
/// resolves when the callback fires.
///
/// The receiver reports `RecvError` if the client is dropped first, since the
/// callback goes with it.
pub fn oneshot_callback() -> (Callback, oneshot::Receiver<Message>) {
    let (tx, rx) = oneshot::channel();
    let callback: Callback = Box::new(move |message: &Message| {
        // The caller may have stopped waiting; nothing to do then.
        let _ = tx.send(message.clone());
    });
    (callback, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_wire::Op;

    #[tokio::test]
    async fn receiver_resolves_with_callback_argument() {
        let (callback, rx) = oneshot_callback();
        let reply = Message::new(Op::Get, "status:/a/x").with_value(1);
        callback(&reply);
        assert_eq!(rx.await.expect("reply"), reply);
    }

    #[tokio::test]
    async fn dropped_callback_closes_receiver() {
        let (callback, rx) = oneshot_callback();
        drop(callback);
        assert!(rx.await.is_err());
    }
}
