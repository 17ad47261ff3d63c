use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid block: {reason}")]
    InvalidBlock { reason: String },
}
