//! The bot server loop: pull messages off the transport, route them, send
//! replies back. Runs until the transport closes or a shutdown signal
//! arrives.

use log::{info, warn};

use crate::chat::router::CommandRouter;
use crate::rpg::store::DocumentStore;
use crate::transport::{ChatTransport, OutboundMessage};

pub struct BotServer<S: DocumentStore> {
    router: CommandRouter<S>,
    transport: ChatTransport,
}

impl<S: DocumentStore> BotServer<S> {
    pub fn new(router: CommandRouter<S>, transport: ChatTransport) -> Self {
        Self { router, transport }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("bot server running (prefix {})", self.router.prefix());
        loop {
            tokio::select! {
                maybe_msg = self.transport.incoming.recv() => {
                    let Some(msg) = maybe_msg else {
                        info!("transport closed; shutting down");
                        break;
                    };
                    if let Some(body) = self.router.handle(&msg).await {
                        let reply = OutboundMessage {
                            chat_id: msg.chat_id.clone(),
                            body,
                        };
                        if self.transport.replies.send(reply).await.is_err() {
                            warn!("reply channel closed; shutting down");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received; shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}
