//! Best-effort push delivery.
//!
//! [`Notifier`] is the delivery boundary; [`Dispatcher`] fans one payload
//! out to many devices without making the caller wait or fail.

pub mod dispatcher;
pub mod notifier;

pub use dispatcher::Dispatcher;
pub use notifier::{HttpPushNotifier, LogNotifier, NotifyError, Notifier};
