//! The single reporting channel for storage failures.
//!
//! Store operations never hand an error back to their caller. Internal
//! helpers return [`Result`](crate::Result); the public entry points pass any
//! failure through [`report`] and carry on with a neutral outcome.

use serde_json::Value;

use crate::error::StoreError;

/// Log `error` under an action tag such as `"legacy:load"`.
pub fn report(action: &'static str, error: &StoreError) {
    tracing::error!(action, kind = %error.kind(), error = %error, "storage operation failed");
}

/// Like [`report`], with extra context attached to the event.
pub fn report_with(action: &'static str, error: &StoreError, data: &Value) {
    tracing::error!(
        action,
        kind = %error.kind(),
        error = %error,
        data = %data,
        "storage operation failed"
    );
}

/// Absorb a failed result into the reporting channel.
pub trait Reported<T> {
    fn reported(self, action: &'static str) -> Option<T>;
}

impl<T> Reported<T> for crate::Result<T> {
    fn reported(self, action: &'static str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                report(action, &e);
                None
            }
        }
    }
}
