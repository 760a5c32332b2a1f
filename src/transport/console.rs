//! Console transport: stdin lines in, stdout replies out. Used by
//! `start --console` for local play without any chat network attached.

use chrono::Utc;
use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::{channel_pair, ChatTransport, InboundMessage, OutboundMessage};

pub const CONSOLE_CHAT_ID: &str = "console";

/// Spawn the console pump tasks and hand back the server side. The inbound
/// task ends when stdin closes, which drops the sender and lets the server
/// loop drain and stop.
pub fn spawn() -> ChatTransport {
    let (transport, in_tx, out_rx) = channel_pair(32);
    tokio::spawn(read_stdin(in_tx));
    tokio::spawn(write_stdout(out_rx));
    transport
}

async fn read_stdin(tx: mpsc::Sender<InboundMessage>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let msg = InboundMessage {
            sender_id: CONSOLE_CHAT_ID.to_string(),
            sender_name: "Console".to_string(),
            chat_id: CONSOLE_CHAT_ID.to_string(),
            body: line,
            timestamp: Utc::now(),
        };
        if tx.send(msg).await.is_err() {
            break;
        }
    }
    debug!("console input closed");
}

async fn write_stdout(mut rx: mpsc::Receiver<OutboundMessage>) {
    while let Some(reply) = rx.recv().await {
        println!("{}", reply.body);
    }
}
