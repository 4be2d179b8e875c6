//! In-process event bus
//!
//! Producers (query loop, tools, input layer) publish [`Event`]s and consumers
//! (the renderer and UI coordinator) react to them. Dispatch is keyed by the
//! closed [`EventType`] enum. Each type has an ordered handler list.
//!
//! `emit` first runs the synchronous handlers in subscription order, then runs
//! all asynchronous handlers concurrently and waits for them. A handler that
//! returns an error or panics is logged and skipped; it never affects other
//! handlers or the emitter. Nothing is queued or retried.

mod event;

pub use event::{Event, EventType};

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

/// Synchronous subscriber
pub type SyncHandler = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// Asynchronous subscriber
pub type AsyncHandler =
    Arc<dyn Fn(Arc<Event>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Handle returned by `subscribe`, needed to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    handlers: RwLock<HashMap<EventType, Vec<Subscription>>>,
    next_id: AtomicU64,
}

/// Event bus for in-process event distribution
///
/// Cloning is cheap and every clone shares the same handler registry.
///
/// # Example
///
/// ```rust
/// use ripcord_core::events::{Event, EventBus, EventType};
///
/// #[tokio::main]
/// async fn main() {
///     let bus = EventBus::new();
///     bus.subscribe(EventType::ToolOutputChunk, |event| {
///         println!("chunk: {:?}", event.get_str("text"));
///         Ok(())
///     });
///     bus.emit(Event::tool_output_chunk("bash", "hello\n")).await;
/// }
/// ```
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous handler for one event type
    pub fn subscribe<F>(&self, event_type: EventType, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(event_type, Handler::Sync(Arc::new(handler)))
    }

    /// Register an asynchronous handler for one event type
    pub fn subscribe_async<F, Fut>(&self, event_type: EventType, handler: F) -> SubscriptionId
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: AsyncHandler = Arc::new(move |event| handler(event).boxed());
        self.register(event_type, Handler::Async(handler))
    }

    fn register(&self, event_type: EventType, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .handlers
            .write()
            .entry(event_type)
            .or_default()
            .push(Subscription { id, handler });
        id
    }

    /// Remove a handler. Returns false if it was not registered for this type.
    pub fn unsubscribe(&self, event_type: EventType, id: SubscriptionId) -> bool {
        let mut handlers = self.inner.handlers.write();
        let Some(list) = handlers.get_mut(&event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|sub| sub.id != id);
        before != list.len()
    }

    /// Number of handlers registered for an event type
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.inner
            .handlers
            .read()
            .get(&event_type)
            .map_or(0, Vec::len)
    }

    /// Deliver an event to every handler registered for its type.
    ///
    /// Returns the number of handlers that completed without error.
    pub async fn emit(&self, event: Event) -> usize {
        // Snapshot so handlers may (un)subscribe while being dispatched.
        let subscriptions = self
            .inner
            .handlers
            .read()
            .get(&event.event_type())
            .cloned()
            .unwrap_or_default();

        if subscriptions.is_empty() {
            trace!(event_type = %event.event_type(), "no subscribers");
            return 0;
        }

        let event = Arc::new(event);
        let mut delivered = 0;
        let mut pending = Vec::new();

        for sub in &subscriptions {
            match &sub.handler {
                Handler::Sync(handler) => {
                    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| handler(&event)));
                    if report(&event, sub.id, outcome) {
                        delivered += 1;
                    }
                }
                Handler::Async(handler) => {
                    match std::panic::catch_unwind(AssertUnwindSafe(|| handler(event.clone()))) {
                        Ok(fut) => pending.push((sub.id, AssertUnwindSafe(fut).catch_unwind())),
                        Err(panic) => {
                            report(&event, sub.id, Err(panic));
                        }
                    }
                }
            }
        }

        let ids: Vec<_> = pending.iter().map(|(id, _)| *id).collect();
        let outcomes = join_all(pending.into_iter().map(|(_, fut)| fut)).await;
        for (id, outcome) in ids.into_iter().zip(outcomes) {
            if report(&event, id, outcome) {
                delivered += 1;
            }
        }

        delivered
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.inner.handlers.read();
        let total: usize = handlers.values().map(Vec::len).sum();
        f.debug_struct("EventBus").field("handlers", &total).finish()
    }
}

fn report(
    event: &Event,
    id: SubscriptionId,
    outcome: std::thread::Result<anyhow::Result<()>>,
) -> bool {
    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(
                event_type = %event.event_type(),
                subscription = id.0,
                "event handler failed: {e:#}"
            );
            false
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(
                event_type = %event.event_type(),
                subscription = id.0,
                "event handler panicked: {message}"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests;
