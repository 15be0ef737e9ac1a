//! The external-service seam.
//!
//! The adapter never talks to the personalization service directly; it goes
//! through this trait, so the transport can be substituted — HTTP in
//! production (see [`crate::http`]), a recording double in tests.

use crate::error::Result;
use async_trait::async_trait;

/// Call surface of the personalization service.
#[async_trait]
pub trait PersonalizationService: Send + Sync {
    /// Announce a new container/slot pairing. Invoked exactly once per
    /// distinct slot name, before the first update for that slot.
    async fn define_slot(&self, container_id: &str, slot: &str) -> Result<()>;

    /// Request content for a slot. `params` carries the caller's
    /// `key=value` parameters plus the injected `callbackid=` pair.
    async fn update(&self, slot: &str, params: &[String]) -> Result<()>;
}

/// A recorded `update` call.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCall {
    pub slot: String,
    pub params: Vec<String>,
}

/// Service double that records every call and never calls back.
///
/// Tests drive the inbound side themselves via [`crate::Experience::resolve`]
/// (or the gate's resolve endpoint), which mirrors how the real service
/// delivers results out of band.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Default)]
pub struct RecordingService {
    defines: std::sync::Mutex<Vec<(String, String)>>,
    updates: std::sync::Mutex<Vec<UpdateCall>>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl RecordingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(container_id, slot)` define calls, in order.
    pub fn defines(&self) -> Vec<(String, String)> {
        self.defines.lock().unwrap().clone()
    }

    /// Recorded update calls, in order.
    pub fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }

    /// Poll until at least `n` update calls are recorded (bounded at ~1s).
    /// The outbound update is deferred to a spawned task, so tests must
    /// wait for it rather than assert immediately after `load`.
    pub async fn wait_for_updates(&self, n: usize) -> Vec<UpdateCall> {
        for _ in 0..200 {
            {
                let updates = self.updates.lock().unwrap();
                if updates.len() >= n {
                    return updates.clone();
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        self.updates.lock().unwrap().clone()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
#[async_trait]
impl PersonalizationService for RecordingService {
    async fn define_slot(&self, container_id: &str, slot: &str) -> Result<()> {
        self.defines
            .lock()
            .unwrap()
            .push((container_id.to_string(), slot.to_string()));
        Ok(())
    }

    async fn update(&self, slot: &str, params: &[String]) -> Result<()> {
        self.updates.lock().unwrap().push(UpdateCall {
            slot: slot.to_string(),
            params: params.to_vec(),
        });
        Ok(())
    }
}
