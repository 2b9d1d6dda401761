use std::sync::Arc;

use tokio::sync::mpsc;

use crate::handlers::action::{ActionEngine, ActionEvent};

/// Drains the event bus into the engine. Events are processed one at a time;
/// ordering within a chat is what the approval flow relies on.
pub async fn run_event_worker(mut rx: mpsc::Receiver<ActionEvent>, engine: Arc<ActionEngine>) {
    while let Some(event) = rx.recv().await {
        engine.handle_event(event).await;
    }
}
