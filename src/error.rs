use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("No slot at {batch} / {day} / period {period}")]
    InvalidSlot {
        batch: String,
        day: String,
        period: usize,
    },

    #[error("Unknown batch: {0}")]
    UnknownBatch(String),

    #[error("Unknown subject {subject_id} for batch {batch}")]
    UnknownSubject { batch: String, subject_id: String },

    #[error("Batch registered twice: {0}")]
    DuplicateBatch(String),

    #[error("Slot {batch} / {day} / period {period} has no subject yet")]
    EmptySlot {
        batch: String,
        day: String,
        period: usize,
    },

    #[error("Invalid drop payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid batch identifier: {0}")]
    InvalidBatchKey(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Submission rejected: {0}")]
    Submission(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;
