//! HTTP client for the personalization service.
//!
//! Outbound calls are JSON POSTs against the service base URL:
//!
//! - define → `POST {base}/v1/define` `{ "container_id": ..., "slot": ... }`
//! - update → `POST {base}/v1/update` `{ "slot": ..., "params": [...] }`
//!
//! Both are fire-and-forget from the adapter's point of view — the result
//! payload arrives later through the resolve entry point, not on these
//! responses. A non-2xx status is still an error: it means the service
//! never accepted the request and no callback will come.

use crate::error::{ExperienceError, Result};
use crate::service::PersonalizationService;
use async_trait::async_trait;
use serde_json::json;

/// Default per-call request timeout in milliseconds.
const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;

pub struct HttpPersonalizationService {
    base_url: String,
    call_timeout_ms: u64,
}

impl HttpPersonalizationService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
        }
    }

    pub fn with_call_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.call_timeout_ms = timeout_ms;
        self
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(self.call_timeout_ms))
            .build()
            .map_err(|e| ExperienceError::Service(e.to_string()))?;

        let resp = client
            .post(join(&self.base_url, path))
            .json(&body)
            .send()
            .await
            .map_err(|e| ExperienceError::Service(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ExperienceError::Service(format!(
                "{path}: service returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PersonalizationService for HttpPersonalizationService {
    async fn define_slot(&self, container_id: &str, slot: &str) -> Result<()> {
        self.post(
            "/v1/define",
            json!({ "container_id": container_id, "slot": slot }),
        )
        .await
    }

    async fn update(&self, slot: &str, params: &[String]) -> Result<()> {
        self.post("/v1/update", json!({ "slot": slot, "params": params }))
            .await
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
