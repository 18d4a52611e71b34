//! Simple stateless pub-sub event handler
//!
//! Components of the engine publish events (a checkout completed, a payment settled or timed out, something odd
//! happened) and hooks registered by the service react to them. The handlers have no access to the engine's state.
//! All they receive is the event itself.
//!
//! Handlers are async and run concurrently. A slow or failing handler never holds up the code that published the
//! event, beyond the back-pressure of a full channel.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    name: &'static str,
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(name: &'static str, buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { name, listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped and all in-flight handler calls have finished.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting {} event handler", self.name);
        // Without this, the channel would never close, since we hold a sender ourselves.
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling {} event", self.name);
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move { (handler)(ev).await });
            // Reap whatever has finished so the set doesn't grow without bound on a busy channel.
            while let Some(res) = jobs.try_join_next() {
                log_job_result(self.name, res);
            }
        }
        debug!("📬️ All {} producers are gone. Waiting for {} jobs to complete", self.name, jobs.len());
        while let Some(res) = jobs.join_next().await {
            log_job_result(self.name, res);
        }
        debug!("📬️ {} event handler has shut down", self.name);
    }
}

fn log_job_result(name: &str, res: Result<(), tokio::task::JoinError>) {
    match res {
        Ok(()) => trace!("📬️ {name} event handled"),
        Err(e) => warn!("📬️ A {name} event handler panicked or was cancelled: {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
