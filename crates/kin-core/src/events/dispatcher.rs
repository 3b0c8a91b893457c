//! Where listener callbacks run.

use tokio::sync::mpsc;

/// One listener invocation.
pub type DeliveryJob = Box<dyn FnOnce() + Send + 'static>;

/// Execution context for listener callbacks.
///
/// Jobs for one account are dispatched in ledger order; an implementation
/// must run them in the order received.
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, job: DeliveryJob);
}

/// Runs callbacks directly on the stream task.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl EventDispatcher for InlineDispatcher {
    fn dispatch(&self, job: DeliveryJob) {
        job();
    }
}

/// Hands callbacks to a [`DeliveryQueue`] drained by the host.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::UnboundedSender<DeliveryJob>,
}

impl ChannelDispatcher {
    pub fn new() -> (Self, DeliveryQueue) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, DeliveryQueue { receiver })
    }
}

impl EventDispatcher for ChannelDispatcher {
    fn dispatch(&self, job: DeliveryJob) {
        if self.sender.send(job).is_err() {
            tracing::debug!("Delivery queue dropped, discarding event");
        }
    }
}

/// Receiving side of a [`ChannelDispatcher`].
pub struct DeliveryQueue {
    receiver: mpsc::UnboundedReceiver<DeliveryJob>,
}

impl DeliveryQueue {
    /// Wait for and run the next job. `false` once every dispatcher is gone.
    pub async fn run_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run every job already queued, returning how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Run jobs until every dispatcher is dropped.
    pub async fn run(mut self) {
        while self.run_next().await {}
    }
}
