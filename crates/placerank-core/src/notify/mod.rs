//! Change notification for history subscribers.
//!
//! Events are queued on an unbounded channel and delivered by a single
//! dispatcher task, so handlers never run on the mutating caller's stack and
//! always see events in emission order. Each `init` starts a fresh generation
//! (queue, dispatcher, handler list); `uninit` ends it.

use crate::{Error, Result};
use placerank_types::{EventKind, LinkEvent};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Event callback. Identity (for `off`) is the `Arc` allocation.
pub type Handler = Arc<dyn Fn(&LinkEvent) + Send + Sync>;

type Registry = Arc<Mutex<Vec<(EventKind, Handler)>>>;

enum Dispatch {
    Event(LinkEvent),
    /// Completed once everything queued before it has been delivered
    Barrier(oneshot::Sender<()>),
}

struct Generation {
    sender: UnboundedSender<Dispatch>,
    handlers: Registry,
}

#[derive(Default)]
pub struct ChangeNotifier {
    generation: Mutex<Option<Generation>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        lock(&self.generation).is_some()
    }

    /// Start delivering events. Returns `false` if already initialized.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the dispatcher is a
    /// spawned task.
    pub fn init(&self) -> bool {
        let mut generation = lock(&self.generation);
        if generation.is_some() {
            return false;
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let handlers: Registry = Arc::default();
        tokio::spawn(dispatch_loop(receiver, Arc::clone(&handlers)));
        *generation = Some(Generation { sender, handlers });
        debug!("Change notifier initialized");
        true
    }

    /// Detach every handler and stop delivery. Events still queued are
    /// dropped. Returns `false` if not initialized.
    pub fn uninit(&self) -> bool {
        let Some(generation) = lock(&self.generation).take() else {
            return false;
        };
        lock(&generation.handlers).clear();
        debug!("Change notifier uninitialized");
        true
    }

    /// Subscribe `handler` to events of `kind`. Handlers for the same kind are
    /// called in subscription order.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotInitialized` before `init` or after `uninit`.
    pub fn on(&self, kind: EventKind, handler: Handler) -> Result<()> {
        let generation = lock(&self.generation);
        let generation = generation.as_ref().ok_or(Error::NotInitialized)?;
        lock(&generation.handlers).push((kind, handler));
        Ok(())
    }

    /// Unsubscribe the first registration of this exact handler for `kind`.
    /// Returns whether one was found.
    pub fn off(&self, kind: EventKind, handler: &Handler) -> bool {
        let generation = lock(&self.generation);
        let Some(generation) = generation.as_ref() else {
            return false;
        };
        let mut handlers = lock(&generation.handlers);
        let found = handlers
            .iter()
            .position(|(k, h)| *k == kind && Arc::ptr_eq(h, handler));
        if let Some(at) = found {
            handlers.remove(at);
        }
        found.is_some()
    }

    /// Queue an event for delivery. Returns `false` (and drops the event)
    /// when not initialized.
    pub fn emit(&self, event: LinkEvent) -> bool {
        match lock(&self.generation).as_ref() {
            Some(generation) => generation.sender.send(Dispatch::Event(event)).is_ok(),
            None => false,
        }
    }

    /// Wait until every event queued so far has been delivered. Returns
    /// immediately when not initialized.
    pub async fn settled(&self) {
        let done = {
            let generation = lock(&self.generation);
            let Some(generation) = generation.as_ref() else {
                return;
            };
            let (tx, rx) = oneshot::channel();
            if generation.sender.send(Dispatch::Barrier(tx)).is_err() {
                return;
            }
            rx
        };
        // Err only if the dispatcher is gone, which means nothing is left to deliver
        let _ = done.await;
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

async fn dispatch_loop(mut receiver: UnboundedReceiver<Dispatch>, handlers: Registry) {
    while let Some(item) = receiver.recv().await {
        match item {
            Dispatch::Event(event) => {
                let kind = event.kind();
                let targets: Vec<Handler> = lock(&handlers)
                    .iter()
                    .filter(|(k, _)| *k == kind)
                    .map(|(_, h)| Arc::clone(h))
                    .collect();
                debug!("Delivering {} to {} handler(s)", kind.name(), targets.len());
                for handler in targets {
                    // A panicking handler must not take the dispatcher down with it
                    if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                        warn!("Handler for {} panicked, continuing delivery", kind.name());
                    }
                }
            }
            Dispatch::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Event dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use placerank_types::Link;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Handler) {
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let seen_for_factory = Arc::clone(&seen);
        let make = move |tag: &str| -> Handler {
            let seen = Arc::clone(&seen_for_factory);
            let tag = tag.to_string();
            Arc::new(move |event: &LinkEvent| {
                seen.lock()
                    .unwrap()
                    .push(format!("{tag}:{}", event.kind().name()));
            })
        };
        (seen, make)
    }

    fn changed(url: &str) -> LinkEvent {
        LinkEvent::LinkChanged {
            link: Link {
                url: url.to_string(),
                title: String::new(),
                frecency: 100,
                last_visit_time: 1,
            },
        }
    }

    #[tokio::test]
    async fn test_on_requires_init() {
        let notifier = ChangeNotifier::new();
        let (_, make) = recorder();
        let result = notifier.on(EventKind::ClearHistory, make("a"));
        assert!(matches!(result, Err(Error::NotInitialized)));
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let notifier = ChangeNotifier::new();
        assert!(notifier.init());
        assert!(!notifier.init());
        assert!(notifier.is_initialized());
        assert!(notifier.uninit());
        assert!(!notifier.uninit());
    }

    #[tokio::test]
    async fn test_delivery_in_subscription_order() {
        let notifier = ChangeNotifier::new();
        notifier.init();
        let (seen, make) = recorder();
        notifier.on(EventKind::LinkChanged, make("first")).unwrap();
        notifier.on(EventKind::LinkChanged, make("second")).unwrap();
        notifier.on(EventKind::ClearHistory, make("clear")).unwrap();

        notifier.emit(changed("https://a/"));
        notifier.emit(LinkEvent::ClearHistory);
        notifier.settled().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:linkChanged", "second:linkChanged", "clear:clearHistory"]
        );
    }

    #[tokio::test]
    async fn test_off_removes_by_identity() {
        let notifier = ChangeNotifier::new();
        notifier.init();
        let (seen, make) = recorder();
        let kept = make("kept");
        let dropped = make("dropped");
        notifier.on(EventKind::DeleteUri, Arc::clone(&kept)).unwrap();
        notifier.on(EventKind::DeleteUri, Arc::clone(&dropped)).unwrap();

        assert!(notifier.off(EventKind::DeleteUri, &dropped));
        assert!(!notifier.off(EventKind::DeleteUri, &dropped));
        assert!(!notifier.off(EventKind::ClearHistory, &kept));

        notifier.emit(LinkEvent::DeleteUri {
            url: "https://a/".into(),
        });
        notifier.settled().await;
        assert_eq!(*seen.lock().unwrap(), vec!["kept:deleteURI"]);
    }

    #[tokio::test]
    async fn test_emit_without_init_is_dropped() {
        let notifier = ChangeNotifier::new();
        assert!(!notifier.emit(LinkEvent::ManyLinksChanged));
        notifier.settled().await;
    }

    #[tokio::test]
    async fn test_uninit_detaches_handlers() {
        let notifier = ChangeNotifier::new();
        notifier.init();
        let (seen, make) = recorder();
        notifier.on(EventKind::ManyLinksChanged, make("old")).unwrap();
        notifier.uninit();

        notifier.init();
        notifier.emit(LinkEvent::ManyLinksChanged);
        notifier.settled().await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handler_may_unsubscribe_itself() {
        let notifier = Arc::new(ChangeNotifier::new());
        notifier.init();
        let calls = Arc::new(Mutex::new(0));

        let slot: Arc<Mutex<Option<Handler>>> = Arc::default();
        let handler: Handler = {
            let notifier = Arc::clone(&notifier);
            let calls = Arc::clone(&calls);
            let slot = Arc::clone(&slot);
            Arc::new(move |_: &LinkEvent| {
                *calls.lock().unwrap() += 1;
                if let Some(me) = slot.lock().unwrap().as_ref() {
                    notifier.off(EventKind::ManyLinksChanged, me);
                }
            })
        };
        *slot.lock().unwrap() = Some(Arc::clone(&handler));
        notifier.on(EventKind::ManyLinksChanged, handler).unwrap();

        notifier.emit(LinkEvent::ManyLinksChanged);
        notifier.emit(LinkEvent::ManyLinksChanged);
        notifier.settled().await;
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_stop_delivery() {
        let notifier = ChangeNotifier::new();
        notifier.init();
        let (seen, make) = recorder();
        let faulty: Handler = Arc::new(|_: &LinkEvent| panic!("handler failure"));
        notifier.on(EventKind::DeleteUri, faulty).unwrap();
        notifier.on(EventKind::DeleteUri, make("after")).unwrap();
        notifier.on(EventKind::ClearHistory, make("clear")).unwrap();

        assert!(notifier.emit(LinkEvent::DeleteUri {
            url: "https://a/".into(),
        }));
        notifier.settled().await;
        assert!(notifier.emit(LinkEvent::ClearHistory));
        notifier.settled().await;

        assert!(notifier.is_initialized());
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["after:deleteURI", "clear:clearHistory"]
        );
    }
}
