use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use mathnook_db::Database;
use mathnook_types::models::ChatRole;

/// One question/answer exchange attributed to a caller.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub owner_id: Uuid,
    pub message: String,
    pub image_url: Option<String>,
    pub response: String,
}

/// Best-effort outbox for chat history.
///
/// Recording never blocks and never fails the caller; a background writer
/// drains the queue into the database. When every handle is dropped the
/// writer finishes the backlog and exits.
#[derive(Clone)]
pub struct ChatLog {
    tx: mpsc::Sender<ChatTurn>,
}

impl ChatLog {
    pub fn spawn(db: Arc<Database>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_writer(db, rx));
        (Self { tx }, handle)
    }

    pub fn record(&self, turn: ChatTurn) {
        match self.tx.try_send(turn) {
            Ok(()) => {}
            Err(TrySendError::Full(turn)) => {
                warn!("Chat log outbox full, dropping turn for {}", turn.owner_id);
            }
            Err(TrySendError::Closed(turn)) => {
                warn!("Chat log writer gone, dropping turn for {}", turn.owner_id);
            }
        }
    }
}

async fn run_writer(db: Arc<Database>, mut rx: mpsc::Receiver<ChatTurn>) {
    while let Some(turn) = rx.recv().await {
        let db = db.clone();
        let owner = turn.owner_id;
        match tokio::task::spawn_blocking(move || write_turn(&db, &turn)).await {
            Ok(Ok(())) => debug!("Logged chat turn for {}", owner),
            Ok(Err(e)) => warn!("Failed to log chat turn for {}: {}", owner, e),
            Err(e) => error!("spawn_blocking join error: {}", e),
        }
    }
    debug!("Chat log writer stopped");
}

/// User message first, then the reply.
fn write_turn(db: &Database, turn: &ChatTurn) -> anyhow::Result<()> {
    let owner = turn.owner_id.to_string();
    db.append_chat_message(
        &owner,
        ChatRole::User.as_str(),
        &turn.message,
        turn.image_url.as_deref(),
    )?;
    db.append_chat_message(&owner, ChatRole::Assistant.as_str(), &turn.response, None)?;
    Ok(())
}
