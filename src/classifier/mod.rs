pub mod heuristic;
pub mod protocol;
pub mod remote;

use thiserror::Error;

pub use remote::{HealthStatus, RemoteClassifier};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassifyError {
    #[error("classification service unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("classification service returned a malformed response: {0}")]
    MalformedResponse(String),
}
