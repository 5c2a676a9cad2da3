//! Rendezvous record channel between the producer and its receivers.
//!
//! The channel has no buffering semantics from the producer's point of view: a send only
//! completes once some receiver has taken the item. Each item travels in an envelope carrying a
//! one-shot acknowledgement, and the receiver acknowledges before handing the item to its
//! caller. A send that is interrupted before the acknowledgement closes the acknowledgement
//! slot, which atomically decides whether the item was taken (and must be counted) or abandoned
//! (and must be dropped by whichever receiver eventually pops it).

use std::future::Future;
use std::sync::Arc;

use recpipe_config::shared::DrainPolicy;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::trace;

/// Item in flight through the channel together with its acknowledgement slot.
#[derive(Debug)]
struct Envelope<T> {
    item: T,
    ack: oneshot::Sender<()>,
}

/// Result of [`RecordSender::send_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// A receiver took the item.
    Delivered,
    /// The interrupt resolved before any receiver took the item, which was dropped.
    Interrupted,
    /// Every receiver is gone.
    Closed,
}

/// Sending side of the record channel.
///
/// There is exactly one sender per run and it is deliberately not [`Clone`]: closing the
/// channel is done by consuming it, so the channel can be closed at most once.
#[derive(Debug)]
pub struct RecordSender<T> {
    tx: mpsc::Sender<Envelope<T>>,
    drain_policy: DrainPolicy,
}

impl<T> RecordSender<T> {
    /// Hands `item` to a receiver, waiting until one takes it or `interrupt` resolves.
    ///
    /// With [`DrainPolicy::Drain`], an item that already sits in the channel when `interrupt`
    /// resolves is still waited for, since receivers keep draining the channel. With
    /// [`DrainPolicy::Discard`] it is abandoned and receivers drop it unacknowledged.
    pub async fn send_until<F>(&self, item: T, interrupt: F) -> SendOutcome
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);

        let (ack_tx, mut ack_rx) = oneshot::channel();
        let envelope = Envelope { item, ack: ack_tx };

        tokio::select! {
            biased;

            _ = &mut interrupt => return SendOutcome::Interrupted,
            sent = self.tx.send(envelope) => {
                if sent.is_err() {
                    return SendOutcome::Closed;
                }
            }
        }

        tokio::select! {
            ack = &mut ack_rx => return Self::outcome_of(ack.is_ok()),
            _ = &mut interrupt => {}
        }

        if self.drain_policy == DrainPolicy::Drain {
            return Self::outcome_of((&mut ack_rx).await.is_ok());
        }

        // Closing the slot races with a receiver acknowledging, and the value left in the slot
        // tells which side won.
        ack_rx.close();
        match ack_rx.try_recv() {
            Ok(()) => SendOutcome::Delivered,
            Err(_) => {
                trace!("in-flight record abandoned after interrupt");
                SendOutcome::Interrupted
            }
        }
    }

    fn outcome_of(acknowledged: bool) -> SendOutcome {
        if acknowledged {
            SendOutcome::Delivered
        } else {
            // The receiver holding the envelope dropped it, which only happens when every
            // receiver is shutting down.
            SendOutcome::Closed
        }
    }

    /// Closes the channel. Receivers drain what is left and then observe the end of stream.
    pub fn close(self) {
        drop(self.tx);
    }
}

/// Receiving side of the record channel, shared by all receivers of a run.
#[derive(Debug)]
pub struct RecordReceiver<T> {
    rx: Arc<Mutex<mpsc::Receiver<Envelope<T>>>>,
}

impl<T> Clone for RecordReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> RecordReceiver<T> {
    /// Takes the next item, or returns `None` once the channel is closed and empty.
    ///
    /// Items abandoned by an interrupted send are skipped. The future is cancel safe: an item
    /// is only removed from the channel in the same poll that returns it.
    pub async fn recv(&self) -> Option<T> {
        let mut rx = self.rx.lock().await;

        loop {
            let envelope = rx.recv().await?;
            if envelope.ack.send(()).is_ok() {
                return Some(envelope.item);
            }

            trace!("skipping record abandoned by the producer");
        }
    }
}

/// Creates a record channel applying `drain_policy` to in-flight items on interruption.
pub fn create_record_channel<T>(drain_policy: DrainPolicy) -> (RecordSender<T>, RecordReceiver<T>) {
    let (tx, rx) = mpsc::channel(1);

    (
        RecordSender { tx, drain_policy },
        RecordReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

#[cfg(test)]
mod tests {
    use std::future::pending;
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;

    #[tokio::test]
    async fn send_waits_for_a_receiver() {
        let (tx, rx) = create_record_channel::<u32>(DrainPolicy::Discard);

        let send = tokio::spawn(async move { tx.send_until(7, pending()).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!send.is_finished());

        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(send.await.unwrap(), SendOutcome::Delivered);
    }

    #[tokio::test]
    async fn interrupted_send_is_never_received() {
        let (tx, rx) = create_record_channel::<u32>(DrainPolicy::Discard);
        let interrupt = Arc::new(Notify::new());

        let send = {
            let interrupt = interrupt.clone();
            tokio::spawn(async move {
                let outcome = tx.send_until(1, interrupt.notified()).await;
                tx.close();
                outcome
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        interrupt.notify_one();

        assert_eq!(send.await.unwrap(), SendOutcome::Interrupted);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn drain_policy_waits_for_in_flight_item() {
        let (tx, rx) = create_record_channel::<u32>(DrainPolicy::Drain);
        let interrupt = Arc::new(Notify::new());

        let send = {
            let interrupt = interrupt.clone();
            tokio::spawn(async move { tx.send_until(3, interrupt.notified()).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        interrupt.notify_one();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(rx.recv().await, Some(3));
        assert_eq!(send.await.unwrap(), SendOutcome::Delivered);
    }

    #[tokio::test]
    async fn send_without_receivers_reports_closed() {
        let (tx, rx) = create_record_channel::<u32>(DrainPolicy::Discard);
        drop(rx);

        assert_eq!(tx.send_until(1, pending()).await, SendOutcome::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_delivered_item_is_received_exactly_once() {
        let (tx, rx) = create_record_channel::<u32>(DrainPolicy::Discard);

        let mut receivers = Vec::new();
        for _ in 0..3 {
            let rx = rx.clone();
            receivers.push(tokio::spawn(async move {
                let mut taken = Vec::new();
                while let Some(item) = rx.recv().await {
                    taken.push(item);
                }
                taken
            }));
        }
        drop(rx);

        let mut delivered = 0;
        for item in 0..500 {
            if tx.send_until(item, pending()).await == SendOutcome::Delivered {
                delivered += 1;
            }
        }
        tx.close();

        let mut taken = Vec::new();
        for receiver in receivers {
            taken.extend(receiver.await.unwrap());
        }
        taken.sort_unstable();

        assert_eq!(delivered, 500);
        assert_eq!(taken, (0..500).collect::<Vec<_>>());
    }
}
