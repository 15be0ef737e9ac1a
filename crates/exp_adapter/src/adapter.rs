//! The adapter object: issues content requests and completes them when the
//! service calls back.
//!
//! State is instance-owned (one `Experience` per process/session), never
//! ambient: the container registry, the pending registry, and the injected
//! service surface all live on the struct. Requires a tokio runtime — the
//! outbound update call is deferred to a spawned task so the pending entry
//! is visible before any callback can race it.

use crate::error::{ExperienceError, Result};
use crate::pending::PendingRegistry;
use crate::service::PersonalizationService;
use crate::types::Container;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

/// Parameter key carrying the callback identifier on the update call.
const CALLBACK_PARAM: &str = "callbackid";

/// Default resolution timeout in milliseconds.
const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 10_000;

/// Monotonic suffix distinguishing callback ids minted in the same
/// millisecond for the same slot.
static CALLBACK_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct ExperienceOptions {
    /// How long [`PendingExperience::wait`] blocks before rejecting with
    /// [`ExperienceError::Timeout`].
    pub resolve_timeout: Duration,
}

impl Default for ExperienceOptions {
    fn default() -> Self {
        Self {
            resolve_timeout: Duration::from_millis(DEFAULT_RESOLVE_TIMEOUT_MS),
        }
    }
}

pub struct Experience {
    service: Arc<dyn PersonalizationService>,
    containers: Mutex<HashMap<String, Container>>,
    pending: Arc<PendingRegistry>,
    opts: ExperienceOptions,
}

impl Experience {
    pub fn new(service: Arc<dyn PersonalizationService>) -> Self {
        Self::with_options(service, ExperienceOptions::default())
    }

    pub fn with_options(service: Arc<dyn PersonalizationService>, opts: ExperienceOptions) -> Self {
        Self {
            service,
            containers: Mutex::new(HashMap::new()),
            pending: Arc::new(PendingRegistry::new()),
            opts,
        }
    }

    /// Request content for `slot` with the given `key=value` parameters.
    ///
    /// On the first request for a slot name this creates its container and
    /// announces the pairing to the service (exactly once per slot). The
    /// returned handle is unsettled when `load` returns; the outbound
    /// update call runs on a spawned task after the pending entry is
    /// registered.
    pub async fn load(&self, slot: &str, params: &[String]) -> Result<PendingExperience> {
        self.ensure_container(slot).await?;

        let callback_id = next_callback_id(slot);
        let rx = self.pending.register(&callback_id);

        let mut full_params = params.to_vec();
        full_params.push(format!("{CALLBACK_PARAM}={callback_id}"));

        let service = Arc::clone(&self.service);
        let pending = Arc::clone(&self.pending);
        let task_slot = slot.to_string();
        let task_id = callback_id.clone();
        tokio::spawn(async move {
            if let Err(err) = service.update(&task_slot, &full_params).await {
                // Nothing will ever resolve this id; drop the entry so the
                // waiter observes Cancelled instead of waiting out the
                // full timeout.
                warn!(callback_id = %task_id, %err, "update call failed, discarding request");
                pending.discard(&task_id);
            }
        });

        Ok(PendingExperience {
            callback_id,
            timeout: self.opts.resolve_timeout,
            pending: Arc::clone(&self.pending),
            rx,
        })
    }

    /// Inbound entry point: complete the pending request for `callback_id`
    /// with `payload`.
    ///
    /// Pure registry lookup-and-complete, independent of how the callback
    /// reached us. An unknown id (never issued, already resolved, timed
    /// out, or discarded) is an explicit error; other pending requests
    /// are unaffected.
    pub fn resolve(&self, callback_id: &str, payload: Value) -> Result<()> {
        debug!(callback_id, "resolve");
        self.pending.complete(callback_id, payload)
    }

    /// Containers created so far, in slot order.
    pub async fn containers(&self) -> Vec<Container> {
        let mut containers: Vec<Container> =
            self.containers.lock().await.values().cloned().collect();
        containers.sort_by(|a, b| a.slot.cmp(&b.slot));
        containers
    }

    /// Number of requests still awaiting resolution.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    async fn ensure_container(&self, slot: &str) -> Result<()> {
        // The lock is held across the define call so concurrent first
        // requests for the same slot cannot both announce it.
        let mut containers = self.containers.lock().await;
        if containers.contains_key(slot) {
            return Ok(());
        }
        let container = Container::new(slot);
        // Define before registering: a failed define leaves no container
        // behind, so the next load retries the announcement.
        self.service.define_slot(&container.id, slot).await?;
        debug!(slot, "container defined");
        containers.insert(slot.to_string(), container);
        Ok(())
    }
}

fn next_callback_id(slot: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = CALLBACK_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{slot}{millis}-{seq}")
}

/// Completion handle returned by [`Experience::load`].
///
/// Settles with the payload delivered through [`Experience::resolve`].
/// Completion is success-only, matching the service protocol; failure
/// surfaces as [`ExperienceError::Timeout`] when the service never calls
/// back within the window, or [`ExperienceError::Cancelled`] when the
/// request was discarded before resolution.
pub struct PendingExperience {
    callback_id: String,
    timeout: Duration,
    pending: Arc<PendingRegistry>,
    rx: oneshot::Receiver<Value>,
}

impl PendingExperience {
    /// The identifier correlating this request with its eventual resolve.
    pub fn callback_id(&self) -> &str {
        &self.callback_id
    }

    /// Non-blocking probe: `Some(payload)` once resolved, `None` while
    /// unsettled.
    pub fn try_take(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }

    /// Await resolution under the configured timeout.
    ///
    /// On timeout the registry entry is removed, so a late resolve for
    /// this id reports `UnknownCallback` rather than completing into the
    /// void, and the entry does not leak.
    pub async fn wait(self) -> Result<Value> {
        let Self {
            callback_id,
            timeout,
            pending,
            rx,
        } = self;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(ExperienceError::Cancelled { callback_id }),
            Err(_) => {
                pending.discard(&callback_id);
                Err(ExperienceError::Timeout {
                    callback_id,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{RecordingService, UpdateCall};
    use async_trait::async_trait;
    use serde_json::json;

    fn callback_id_of(call: &UpdateCall) -> String {
        call.params
            .iter()
            .find_map(|p| p.strip_prefix("callbackid="))
            .expect("update must carry a callbackid param")
            .to_string()
    }

    #[tokio::test]
    async fn first_load_defines_slot_exactly_once() {
        let service = Arc::new(RecordingService::new());
        let experience = Experience::new(service.clone());

        let _a = experience.load("promo1", &[]).await.unwrap();
        let _b = experience.load("promo1", &[]).await.unwrap();

        assert_eq!(service.defines(), vec![("promo1".to_string(), "promo1".to_string())]);
        assert_eq!(experience.containers().await.len(), 1);
    }

    #[tokio::test]
    async fn load_returns_an_unsettled_handle() {
        let service = Arc::new(RecordingService::new());
        let experience = Experience::new(service);

        let mut handle = experience.load("promo1", &[]).await.unwrap();
        assert!(handle.try_take().is_none());
    }

    #[tokio::test]
    async fn update_carries_slot_params_and_callback_id() {
        let service = Arc::new(RecordingService::new());
        let experience = Experience::new(service.clone());

        let handle = experience
            .load("promo1", &["region=US".to_string()])
            .await
            .unwrap();

        let updates = service.wait_for_updates(1).await;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].slot, "promo1");
        assert_eq!(updates[0].params[0], "region=US");
        let id = callback_id_of(&updates[0]);
        assert!(id.starts_with("promo1"));
        assert_eq!(id, handle.callback_id());
    }

    #[tokio::test]
    async fn resolve_settles_handle_with_payload_and_consumes_entry() {
        let service = Arc::new(RecordingService::new());
        let experience = Experience::new(service.clone());

        let handle = experience
            .load("promo1", &["region=US".to_string()])
            .await
            .unwrap();
        let id = callback_id_of(&service.wait_for_updates(1).await[0]);

        let payload = json!({"html": "<div>Offer</div>"});
        experience.resolve(&id, payload.clone()).unwrap();
        assert_eq!(handle.wait().await.unwrap(), payload);
        assert_eq!(experience.pending_len(), 0);

        // Entry is gone: a second resolve for the same id must fail.
        let err = experience.resolve(&id, json!(null)).unwrap_err();
        assert!(matches!(err, ExperienceError::UnknownCallback { .. }));
    }

    #[tokio::test]
    async fn distinct_slots_resolve_independently() {
        let service = Arc::new(RecordingService::new());
        let experience = Experience::new(service.clone());

        let first = experience.load("promo1", &[]).await.unwrap();
        let second = experience.load("banner", &[]).await.unwrap();
        assert_ne!(first.callback_id(), second.callback_id());

        let updates = service.wait_for_updates(2).await;
        assert_eq!(updates.len(), 2);

        // Resolve out of order; each handle gets its own payload.
        experience
            .resolve(second.callback_id(), json!({"for": "banner"}))
            .unwrap();
        experience
            .resolve(first.callback_id(), json!({"for": "promo1"}))
            .unwrap();
        assert_eq!(second.wait().await.unwrap(), json!({"for": "banner"}));
        assert_eq!(first.wait().await.unwrap(), json!({"for": "promo1"}));
    }

    #[tokio::test]
    async fn same_millisecond_loads_get_distinct_ids() {
        let service = Arc::new(RecordingService::new());
        let experience = Experience::new(service);

        // Back-to-back loads land in the same millisecond on any modern
        // machine; the monotonic suffix must keep the ids apart.
        let a = experience.load("promo1", &[]).await.unwrap();
        let b = experience.load("promo1", &[]).await.unwrap();
        assert_ne!(a.callback_id(), b.callback_id());
    }

    #[tokio::test]
    async fn unresolved_handle_times_out_and_clears_its_entry() {
        let service = Arc::new(RecordingService::new());
        let experience = Experience::with_options(
            service,
            ExperienceOptions {
                resolve_timeout: Duration::from_millis(20),
            },
        );

        let handle = experience.load("promo1", &[]).await.unwrap();
        let id = handle.callback_id().to_string();

        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, ExperienceError::Timeout { timeout_ms: 20, .. }));
        assert_eq!(experience.pending_len(), 0);

        // A late resolve after the timeout reports the id as unknown.
        assert!(experience.resolve(&id, json!(null)).is_err());
    }

    #[tokio::test]
    async fn resolve_unknown_id_is_an_error() {
        let service = Arc::new(RecordingService::new());
        let experience = Experience::new(service);

        let err = experience.resolve("never-issued", json!(null)).unwrap_err();
        assert!(matches!(
            err,
            ExperienceError::UnknownCallback { callback_id } if callback_id == "never-issued"
        ));
    }

    struct FailingUpdate;

    #[async_trait]
    impl PersonalizationService for FailingUpdate {
        async fn define_slot(&self, _container_id: &str, _slot: &str) -> Result<()> {
            Ok(())
        }

        async fn update(&self, _slot: &str, _params: &[String]) -> Result<()> {
            Err(ExperienceError::Service("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn failed_update_cancels_the_waiter() {
        let experience = Experience::new(Arc::new(FailingUpdate));

        let handle = experience.load("promo1", &[]).await.unwrap();
        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, ExperienceError::Cancelled { .. }));
        assert_eq!(experience.pending_len(), 0);
    }

    struct FlakyDefine {
        calls: AtomicU64,
    }

    #[async_trait]
    impl PersonalizationService for FlakyDefine {
        async fn define_slot(&self, _container_id: &str, _slot: &str) -> Result<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ExperienceError::Service("define refused".into()));
            }
            Ok(())
        }

        async fn update(&self, _slot: &str, _params: &[String]) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_define_leaves_no_container_and_next_load_retries() {
        let service = Arc::new(FlakyDefine {
            calls: AtomicU64::new(0),
        });
        let experience = Experience::new(service.clone());

        assert!(experience.load("promo1", &[]).await.is_err());
        assert!(experience.containers().await.is_empty());

        // Second load retries the define and succeeds.
        let _handle = experience.load("promo1", &[]).await.unwrap();
        assert_eq!(experience.containers().await.len(), 1);
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }
}
