#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Invalid script for {name}: {reason}")]
    InvalidScript { name: String, reason: &'static str },
}
