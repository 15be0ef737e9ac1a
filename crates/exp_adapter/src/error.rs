use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExperienceError {
    #[error("resolve: no pending request for callback id '{callback_id}'")]
    UnknownCallback { callback_id: String },

    #[error("timeout: callback id '{callback_id}' unresolved after {timeout_ms}ms")]
    Timeout { callback_id: String, timeout_ms: u64 },

    #[error("cancelled: request '{callback_id}' discarded before resolution")]
    Cancelled { callback_id: String },

    #[error("param: {0}")]
    InvalidParam(String),

    #[error("service: {0}")]
    Service(String),

    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExperienceError>;
