//! Channel-backed [`Transport`].

use crossbeam_channel::{Sender, TrySendError};

use super::traits::Transport;
use crate::client::ClientId;
use crate::entity::EntityId;

/// Message handed to the network thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Encoded entity frame.
    Update {
        /// Recipient.
        client: ClientId,
        /// Entity the frame describes.
        entity: EntityId,
        /// Encoded bytes.
        frame: Vec<u8>,
    },
    /// Entity left the recipient's view.
    Despawn {
        /// Recipient.
        client: ClientId,
        /// Departed entity.
        entity: EntityId,
    },
}

impl OutboundFrame {
    /// Returns the recipient.
    #[inline]
    #[must_use]
    pub const fn client(&self) -> ClientId {
        match self {
            Self::Update { client, .. } | Self::Despawn { client, .. } => *client,
        }
    }
}

/// Non-blocking [`Transport`] over a bounded crossbeam channel.
///
/// The sync thread never waits on the network thread: when the channel is
/// full the message is dropped and counted.
#[derive(Debug)]
pub struct ChannelTransport {
    sender: Sender<OutboundFrame>,
    sent: u64,
    dropped: u64,
}

impl ChannelTransport {
    /// Wraps the sending half of a channel.
    #[must_use]
    pub const fn new(sender: Sender<OutboundFrame>) -> Self {
        Self {
            sender,
            sent: 0,
            dropped: 0,
        }
    }

    /// Messages accepted by the channel.
    #[inline]
    #[must_use]
    pub const fn sent(&self) -> u64 {
        self.sent
    }

    /// Messages dropped because the channel was full or closed.
    #[inline]
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    fn push(&mut self, message: OutboundFrame) {
        match self.sender.try_send(message) {
            Ok(()) => self.sent += 1,
            Err(TrySendError::Full(message)) => {
                self.dropped += 1;
                tracing::warn!(client = message.client().raw(), "outbound channel full, frame dropped");
            }
            Err(TrySendError::Disconnected(message)) => {
                self.dropped += 1;
                tracing::warn!(client = message.client().raw(), "outbound channel closed, frame dropped");
            }
        }
    }
}

impl Transport for ChannelTransport {
    fn send_update(&mut self, client: ClientId, entity: EntityId, frame: Vec<u8>) {
        self.push(OutboundFrame::Update {
            client,
            entity,
            frame,
        });
    }

    fn send_despawn(&mut self, client: ClientId, entity: EntityId) {
        self.push(OutboundFrame::Despawn { client, entity });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_forwards_in_order() {
        let (tx, rx) = bounded(8);
        let mut transport = ChannelTransport::new(tx);

        transport.send_update(ClientId(1), EntityId(5), vec![1, 2, 3]);
        transport.send_despawn(ClientId(2), EntityId(5));

        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundFrame::Update {
                client: ClientId(1),
                entity: EntityId(5),
                frame: vec![1, 2, 3],
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundFrame::Despawn {
                client: ClientId(2),
                entity: EntityId(5),
            }
        );
        assert_eq!(transport.sent(), 2);
        assert_eq!(transport.dropped(), 0);
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (tx, rx) = bounded(1);
        let mut transport = ChannelTransport::new(tx);

        transport.send_despawn(ClientId(1), EntityId(1));
        transport.send_despawn(ClientId(1), EntityId(2));

        assert_eq!(transport.sent(), 1);
        assert_eq!(transport.dropped(), 1);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_closed_channel_counts_drops() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let mut transport = ChannelTransport::new(tx);

        transport.send_update(ClientId(1), EntityId(1), Vec::new());
        assert_eq!(transport.dropped(), 1);
    }
}
