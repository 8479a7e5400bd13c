//! Transport seam between the coordinator and connected participants

use async_trait::async_trait;

use super::notice::RoomNotice;
use crate::models::ParticipantId;

/// Outbound half of the transport layer
///
/// Delivery is best effort: implementations drop messages for peers that
/// are gone or cannot keep up instead of blocking the room.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Deliver to a single participant
    async fn send_to(&self, participant: ParticipantId, notice: RoomNotice);

    /// Deliver to every connected participant
    async fn broadcast(&self, notice: RoomNotice);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    /// Where a notice was sent: `None` means broadcast
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Delivery {
        pub to: Option<ParticipantId>,
        pub notice: RoomNotice,
    }

    /// Transport that forwards every delivery into a channel
    pub(crate) struct ChannelTransport {
        tx: mpsc::UnboundedSender<Delivery>,
    }

    impl ChannelTransport {
        pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Self { tx }, rx)
        }
    }

    #[async_trait]
    impl Transport for ChannelTransport {
        async fn send_to(&self, participant: ParticipantId, notice: RoomNotice) {
            let _ = self.tx.send(Delivery {
                to: Some(participant),
                notice,
            });
        }

        async fn broadcast(&self, notice: RoomNotice) {
            let _ = self.tx.send(Delivery { to: None, notice });
        }
    }

    /// Skip deliveries until one matches, failing after a second
    pub(crate) async fn wait_for<F>(rx: &mut mpsc::UnboundedReceiver<Delivery>, pred: F) -> Delivery
    where
        F: Fn(&Delivery) -> bool,
    {
        let wait = async {
            loop {
                match rx.recv().await {
                    Some(d) if pred(&d) => return d,
                    Some(_) => continue,
                    None => panic!("transport channel closed"),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(1), wait)
            .await
            .expect("timed out waiting for delivery")
    }

    /// Everything delivered so far
    pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<Delivery>) -> Vec<Delivery> {
        let mut out = Vec::new();
        while let Ok(d) = rx.try_recv() {
            out.push(d);
        }
        out
    }
}
