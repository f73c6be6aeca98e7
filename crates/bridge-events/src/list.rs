use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{self, Duration, Instant};
use tracing::debug;

use crate::error::{PublishError, Result};
use crate::subscriber::Subscriber;

/// Callback receiving the payload of a subscriber task that panicked during
/// a parallel publish.
pub type PanicHandler = dyn Fn(Box<dyn Any + Send>) + Send + Sync;

/// An insertion-ordered collection of subscribers for one event kind.
///
/// Duplicate registrations of the same instance are ignored; removal closes
/// the subscriber and preserves the relative order of the rest. The list
/// itself is not synchronized: concurrent mutation is the caller's
/// responsibility, publishing only borrows it.
pub struct SubscriberList<T> {
    subscribers: Vec<Arc<dyn Subscriber<T>>>,
}

impl<T> Default for SubscriberList<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone + Send + 'static> SubscriberList<T> {
    /// Create an empty subscriber list
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Check whether no subscribers are registered
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Register a subscriber; re-adding the same instance is a no-op
    pub fn add(&mut self, subscriber: Arc<dyn Subscriber<T>>) {
        if self
            .subscribers
            .iter()
            .any(|existing| Arc::ptr_eq(existing, &subscriber))
        {
            return;
        }

        debug!(subscriber = subscriber.name(), "registering subscriber");
        self.subscribers.push(subscriber);
    }

    /// Unregister a subscriber and close it; unknown instances are ignored
    pub fn remove(&mut self, subscriber: &Arc<dyn Subscriber<T>>) {
        let Some(index) = self
            .subscribers
            .iter()
            .position(|existing| Arc::ptr_eq(existing, subscriber))
        else {
            return;
        };

        debug!(subscriber = subscriber.name(), "removing subscriber");
        self.subscribers[index].close();
        self.subscribers.remove(index);
    }

    /// Deliver one event to every subscriber, in registration order, under
    /// one shared deadline.
    ///
    /// The first failure stops the iteration and is returned wrapped with
    /// the offending subscriber's name; deadline exhaustion is normalized to
    /// [`PublishError::Timeout`]. Panics are not caught here.
    pub async fn publish(&self, event: T, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        for subscriber in &self.subscribers {
            match time::timeout_at(deadline, subscriber.handle(event.clone())).await {
                Ok(Ok(())) => {}
                Ok(Err(source)) => {
                    return Err(PublishError::from_handle(subscriber.name(), source));
                }
                Err(_) => return Err(PublishError::timeout(subscriber.name())),
            }

            if deadline <= Instant::now() {
                return Err(PublishError::timeout(subscriber.name()));
            }
        }

        Ok(())
    }

    /// Deliver one event to every subscriber concurrently, bounded to
    /// `max(1, CPU/2)` workers, under one shared deadline.
    ///
    /// A single-subscriber list degrades to the sequential path. A panicking
    /// subscriber is contained to its own task: the panic payload is handed
    /// to `panic_handler` and converted into an error naming that
    /// subscriber, while the remaining deliveries run to completion. The
    /// first subscriber *error* aborts the outstanding deliveries. The first
    /// error observed is returned; no ordering between subscribers is
    /// guaranteed.
    pub async fn publish_parallel(
        &self,
        event: T,
        panic_handler: &PanicHandler,
        timeout: Duration,
    ) -> Result<()> {
        if self.subscribers.len() <= 1 {
            return self.publish(event, timeout).await;
        }

        let deadline = Instant::now() + timeout;
        let workers = (num_cpus::get() / 2).max(1);
        let semaphore = Arc::new(Semaphore::new(workers));

        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();

        for subscriber in &self.subscribers {
            let name = subscriber.name().to_string();
            let subscriber = Arc::clone(subscriber);
            let event = event.clone();
            let semaphore = Arc::clone(&semaphore);

            let task_name = name.clone();
            let handle = tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Ok(());
                };

                match time::timeout_at(deadline, subscriber.handle(event)).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(source)) => Err(PublishError::from_handle(&task_name, source)),
                    Err(_) => Err(PublishError::timeout(&task_name)),
                }
            });

            names.insert(handle.id(), name);
        }

        let mut first_error = None;

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((_, Err(error))) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                        tasks.abort_all();
                    }
                }
                Err(join_error) => {
                    // Aborted deliveries also land here; only panics are of
                    // interest, and they must not take the others down.
                    if join_error.is_panic() {
                        let id = join_error.id();
                        panic_handler(join_error.into_panic());

                        if first_error.is_none() {
                            let name = names.get(&id).cloned().unwrap_or_default();
                            first_error = Some(PublishError::subscriber(
                                name,
                                anyhow::anyhow!("subscriber panicked"),
                            ));
                        }
                    }
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
