use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sii_db::Database;
use sii_push::{Dispatcher, NotifyError, Notifier};
use sii_types::push::PushPayload;

use crate::coordinator::Coordinator;
use crate::proximity::DEFAULT_DELTA;

/// Notifier double that remembers every delivery.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<(String, PushPayload)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<(String, PushPayload)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.sent().into_iter().map(|(t, _)| t).collect();
        tokens.sort();
        tokens
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, token: &str, payload: &PushPayload) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((token.to_string(), payload.clone()));
        if self.fail {
            return Err(NotifyError::Rejected { status: 500 });
        }
        Ok(())
    }
}

pub(crate) struct Harness {
    pub db: Arc<Database>,
    pub notifier: Arc<RecordingNotifier>,
    pub coordinator: Coordinator,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default())
    }

    pub(crate) fn with_notifier(notifier: RecordingNotifier) -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let notifier = Arc::new(notifier);
        let dispatcher = Dispatcher::new(notifier.clone());
        let coordinator = Coordinator::new(db.clone(), dispatcher, DEFAULT_DELTA);
        Self {
            db,
            notifier,
            coordinator,
        }
    }

    /// Wait for background notifications to finish.
    pub(crate) async fn settle(&self) {
        self.coordinator.dispatcher().drain().await;
    }
}
