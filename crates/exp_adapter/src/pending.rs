//! Pending-request registry: callback id → one-shot completion sender.
//!
//! An entry is registered before the outbound update call is issued and
//! consumed by the inbound resolve. Invariant: at most one sender per id.
//! Entries are also removed when a waiter times out or an update call
//! fails, so the registry cannot grow for the lifetime of the process.

use crate::error::{ExperienceError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Default)]
pub struct PendingRegistry {
    inner: Mutex<HashMap<String, oneshot::Sender<Value>>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a completion channel and register its sender under `id`.
    ///
    /// Callback ids are generated unique, so a collision here is a bug in
    /// the caller; if one happens anyway the previous sender is dropped
    /// (its waiter observes `Cancelled`) and the newer request wins.
    pub fn register(&self, id: &str) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().unwrap();
        if inner.insert(id.to_string(), tx).is_some() {
            warn!(callback_id = id, "pending entry overwritten");
        }
        rx
    }

    /// Complete the pending request for `id` with `payload`, removing it.
    ///
    /// An absent id is an explicit error: the id was never issued, or was
    /// already resolved, timed out, or discarded.
    pub fn complete(&self, id: &str, payload: Value) -> Result<()> {
        let sender = self.inner.lock().unwrap().remove(id);
        match sender {
            Some(tx) => {
                if tx.send(payload).is_err() {
                    // Waiter already gone; the entry is consumed either way.
                    debug!(callback_id = id, "resolve arrived after waiter left");
                }
                Ok(())
            }
            None => Err(ExperienceError::UnknownCallback {
                callback_id: id.to_string(),
            }),
        }
    }

    /// Drop the entry for `id` without completing it. Returns whether an
    /// entry existed.
    pub fn discard(&self, id: &str) -> bool {
        self.inner.lock().unwrap().remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().unwrap().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
