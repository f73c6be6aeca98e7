use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

/// The entry point for consuming one typed event stream.
///
/// `handle` is the single synchronous handoff point: the publisher awaits it
/// under its deadline, and dropping the future at that deadline is how
/// delivery is cancelled. `cancel` exists for channel-backed subscribers so
/// that unsubscribing does not leave racing publishers blocked on events
/// nobody will consume.
#[async_trait]
pub trait Subscriber<T: Send + 'static>: Send + Sync {
    /// Identifier used in diagnostics and publish errors
    fn name(&self) -> &str;

    /// Deliver one event to this subscriber
    async fn handle(&self, event: T) -> anyhow::Result<()>;

    /// Drain pending handoffs so publishers racing with an unsubscribe are
    /// not left waiting for their deadline
    fn cancel(&self);

    /// Release the resources backing this subscriber
    fn close(&self);
}

/// One event travelling to a channelled consumer, paired with the reply slot
/// the consumer answers on.
pub struct EventHandoff<T> {
    event: T,
    reply: oneshot::Sender<anyhow::Error>,
}

impl<T> EventHandoff<T> {
    /// Run the consumer closure over the event and report its outcome back
    /// to the blocked publisher. Only a failure is sent back; dropping the
    /// reply slot without a value counts as success.
    pub fn consume<F>(self, consumer: F)
    where
        F: FnOnce(T) -> anyhow::Result<()>,
    {
        if let Err(error) = consumer(self.event) {
            let _ = self.reply.send(error);
        }
    }

    /// Peek at the event payload without consuming the handoff
    pub fn event(&self) -> &T {
        &self.event
    }
}

/// Adapter that converts a pull-style consumer loop into the push-style
/// [`Subscriber`] contract.
///
/// Every `handle` call enqueues the event on an unbuffered rendezvous
/// channel and blocks until the consumer replies, so a publisher is paced by
/// its slowest consumer and bounded only by its own deadline. The consumer
/// side runs a loop over [`event_receiver`](ChanneledSubscriber::event_receiver).
pub struct ChanneledSubscriber<T> {
    id: String,
    sender: Mutex<Option<flume::Sender<EventHandoff<T>>>>,
    receiver: flume::Receiver<EventHandoff<T>>,
}

impl<T: Send + 'static> ChanneledSubscriber<T> {
    /// Create a subscriber around a fresh rendezvous channel
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, receiver) = flume::bounded(0);
        Self {
            id: name.into(),
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// The receive side of the rendezvous channel, for the consumer loop.
    /// The loop terminates once the subscriber is closed and drained.
    pub fn event_receiver(&self) -> flume::Receiver<EventHandoff<T>> {
        self.receiver.clone()
    }

    fn sender(&self) -> Option<flume::Sender<EventHandoff<T>>> {
        match self.sender.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Subscriber<T> for ChanneledSubscriber<T> {
    fn name(&self) -> &str {
        &self.id
    }

    async fn handle(&self, event: T) -> anyhow::Result<()> {
        let Some(sender) = self.sender() else {
            anyhow::bail!("subscriber {} is closed", self.id);
        };

        let (reply, outcome) = oneshot::channel();

        sender
            .send_async(EventHandoff { event, reply })
            .await
            .map_err(|_| anyhow::anyhow!("failed to hand event to {}", self.id))?;

        match outcome.await {
            Ok(error) => Err(error),
            // Reply slot dropped without a value: the consumer accepted the event.
            Err(_) => Ok(()),
        }
    }

    fn cancel(&self) {
        let receiver = self.receiver.clone();
        let name = self.id.clone();

        tokio::spawn(async move {
            while let Ok(handoff) = receiver.recv_async().await {
                handoff.consume(|_| Ok(()));
            }
            debug!(subscriber = %name, "drainer finished");
        });
    }

    fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}
