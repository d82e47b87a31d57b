use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::ai::{self, TextGenerator};
use crate::assistant::{AiCompletion, Ticket};

/// Runs generation requests on the tokio runtime and hands completions back
/// to the single-threaded UI loop.
pub struct Dispatcher {
    generator: Arc<dyn TextGenerator>,
    handle: Handle,
    tx: UnboundedSender<AiCompletion>,
    rx: UnboundedReceiver<AiCompletion>,
}

impl Dispatcher {
    pub fn new(generator: Arc<dyn TextGenerator>, handle: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            generator,
            handle,
            tx,
            rx,
        }
    }

    pub fn dispatch(&self, ticket: Ticket, content: String, title: String) {
        let generator = Arc::clone(&self.generator);
        let tx = self.tx.clone();
        debug!(request_id = ticket.request_id, task = ?ticket.task, "Dispatching AI request");

        self.handle.spawn(async move {
            let result = ai::run_task(generator.as_ref(), ticket.task, &content, &title).await;
            // receiver only goes away on shutdown
            let _ = tx.send(AiCompletion { ticket, result });
        });
    }

    /// Next finished request, without blocking.
    pub fn try_next(&mut self) -> Option<AiCompletion> {
        self.rx.try_recv().ok()
    }

    #[cfg(test)]
    pub async fn next(&mut self) -> Option<AiCompletion> {
        self.rx.recv().await
    }
}
