use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A placeholder registered for a content slot.
///
/// Created lazily on the first request for a slot name, announced to the
/// service via the define call, and reused for every later request to the
/// same slot. Containers are never destroyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    /// Container identifier — equal to the slot name, matching the
    /// `(container, slot)` pairing the service's define call expects.
    pub id: String,
    /// The slot this container hosts.
    pub slot: String,
    /// When the container was created and its slot defined.
    pub defined_at: DateTime<Utc>,
}

impl Container {
    pub fn new(slot: &str) -> Self {
        Self {
            id: slot.to_string(),
            slot: slot.to_string(),
            defined_at: Utc::now(),
        }
    }
}
