#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}
