//! Message transport seam. The bot core only sees [`InboundMessage`] and
//! [`OutboundMessage`] values moving over channels; delivery, media and
//! connection state belong to whatever sits on the other side. The built-in
//! [`console`] transport drives the bot from stdin for local play and tests.

pub mod console;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// A chat message arriving from the transport. `sender_id` is the stable
/// identity key the engine stores records under; `sender_name` is only a
/// display default at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: String,
    pub sender_name: String,
    pub chat_id: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// A reply heading back out. Replies go to the chat the command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: String,
    pub body: String,
}

/// The server side of a transport: messages in, replies out.
pub struct ChatTransport {
    pub incoming: mpsc::Receiver<InboundMessage>,
    pub replies: mpsc::Sender<OutboundMessage>,
}

/// Build a connected transport pair: the [`ChatTransport`] for the server
/// and the raw channel ends for the transport implementation (or a test).
pub fn channel_pair(
    buffer: usize,
) -> (
    ChatTransport,
    mpsc::Sender<InboundMessage>,
    mpsc::Receiver<OutboundMessage>,
) {
    let (in_tx, in_rx) = mpsc::channel(buffer);
    let (out_tx, out_rx) = mpsc::channel(buffer);
    (
        ChatTransport {
            incoming: in_rx,
            replies: out_tx,
        },
        in_tx,
        out_rx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_pair_moves_messages_both_ways() {
        let (mut transport, in_tx, mut out_rx) = channel_pair(4);
        in_tx
            .send(InboundMessage {
                sender_id: "u1".into(),
                sender_name: "One".into(),
                chat_id: "room".into(),
                body: "!profile".into(),
                timestamp: Utc::now(),
            })
            .await
            .expect("send");
        let msg = transport.incoming.recv().await.expect("recv");
        assert_eq!(msg.body, "!profile");

        transport
            .replies
            .send(OutboundMessage {
                chat_id: msg.chat_id.clone(),
                body: "hello".into(),
            })
            .await
            .expect("reply");
        assert_eq!(out_rx.recv().await.expect("reply recv").body, "hello");
    }
}
