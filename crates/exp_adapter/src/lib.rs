//! Experience adapter — promise-style facade over a callback-based
//! content-personalization service.
//!
//! The upstream service speaks a fire-and-forget protocol: you announce a
//! named content slot once, issue an "update" call carrying your parameters,
//! and some time later the service calls a resolve entry point with a result
//! payload. This crate turns that into request/response:
//!
//! ```text
//! Experience::load(slot, params)
//!   │  ensure container + define_slot     (once per slot name)
//!   │  register callback id → sender      (pending registry)
//!   │  spawn update(slot, params ++ callbackid=<id>)
//!   ▼
//! PendingExperience                        (unsettled at return)
//!
//! Experience::resolve(callback_id, payload)   ← inbound, transport-agnostic
//!   │  remove sender, complete with payload
//!   ▼
//! PendingExperience::wait() → payload
//! ```
//!
//! The call surface of the service is injected as a trait object
//! ([`PersonalizationService`]), so transports can be substituted — HTTP in
//! production (the `http` feature), a recording double in tests.

pub mod adapter;
pub mod error;
pub mod params;
pub mod pending;
pub mod service;
pub mod types;

#[cfg(feature = "http")]
pub mod http;

pub use adapter::{Experience, ExperienceOptions, PendingExperience};
pub use error::ExperienceError;
pub use service::PersonalizationService;
pub use types::Container;

#[cfg(feature = "http")]
pub use http::HttpPersonalizationService;

#[cfg(any(test, feature = "test-helpers"))]
pub use service::{RecordingService, UpdateCall};
