use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use sii_types::push::PushPayload;

use crate::notifier::Notifier;

/// Fans notifications out as independent background tasks.
///
/// Each recipient gets its own task, so one slow or failing device never
/// delays or fails another, and callers never wait on delivery.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    notifier: Arc<dyn Notifier>,

    /// Tracks in-flight deliveries so shutdown can wait for them
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                notifier,
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Start one delivery of `payload` per distinct non-empty token.
    /// Returns the number of deliveries started.
    pub fn fan_out<I, S>(&self, tokens: I, payload: PushPayload) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let payload = Arc::new(payload);
        let mut seen = HashSet::new();

        for token in tokens {
            let token = token.into();
            if token.is_empty() || !seen.insert(token.clone()) {
                continue;
            }
            self.spawn_delivery(token, payload.clone());
        }

        debug!("Dispatched {} to {} device(s)", payload.kind(), seen.len());
        seen.len()
    }

    /// Start a single delivery. Empty tokens are ignored.
    pub fn send(&self, token: &str, payload: PushPayload) -> bool {
        self.fan_out([token], payload) == 1
    }

    /// Deliveries started but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Wait until every delivery started so far has finished.
    pub async fn drain(&self) {
        let tracker = &self.inner.tracker;
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
    }

    fn spawn_delivery(&self, token: String, payload: Arc<PushPayload>) {
        let notifier = self.inner.notifier.clone();
        self.inner.tracker.spawn(async move {
            match notifier.notify(&token, &payload).await {
                Ok(()) => debug!("Push {} sent to {}", payload.kind(), token),
                Err(e) => warn!("Push {} to {} failed: {}", payload.kind(), token, e),
            }
        });
    }
}
