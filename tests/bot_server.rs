//! Full loop test: messages through the transport channels, parsed and
//! dispatched by the router, replies back out.

use std::sync::Arc;

use chatforge::chat::{BotServer, CommandRouter};
use chatforge::rpg::{Catalog, MemoryStore, RetryPolicy, RpgEngine};
use chatforge::transport::{channel_pair, InboundMessage};
use chrono::Utc;

fn inbound(sender: &str, body: &str) -> InboundMessage {
    InboundMessage {
        sender_id: sender.to_string(),
        sender_name: sender.to_string(),
        chat_id: "group".to_string(),
        body: body.to_string(),
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn server_answers_commands_and_drains_on_close() {
    let engine = RpgEngine::open_seeded(
        Catalog::builtin(),
        MemoryStore::new(),
        RetryPolicy::default(),
        99,
    )
    .expect("engine");
    let router = CommandRouter::new(
        Arc::new(engine),
        "!".to_string(),
        "Welcome!".to_string(),
        10,
    );
    let (transport, in_tx, mut out_rx) = channel_pair(16);
    let server = tokio::spawn(BotServer::new(router, transport).run());

    in_tx.send(inbound("alice", "!register Alice")).await.expect("send");
    let reply = out_rx.recv().await.expect("reply");
    assert_eq!(reply.chat_id, "group");
    assert!(reply.body.contains("Alice"));

    // Plain chatter gets no reply; the next command still does.
    in_tx.send(inbound("alice", "nice weather today")).await.expect("send");
    in_tx.send(inbound("alice", "!profile")).await.expect("send");
    let reply = out_rx.recv().await.expect("reply");
    assert!(reply.body.contains("level 1"));

    // Second player shares the same document.
    in_tx.send(inbound("bob", "!register Bob")).await.expect("send");
    out_rx.recv().await.expect("register reply");
    in_tx.send(inbound("bob", "!top level")).await.expect("send");
    let reply = out_rx.recv().await.expect("reply");
    assert!(reply.body.contains("Alice"));
    assert!(reply.body.contains("Bob"));

    // Closing the inbound side shuts the server down.
    drop(in_tx);
    server.await.expect("join").expect("run");
}
