/*!

The crate-wide error type. Every fallible operation returns `Result<_, SimError>`; nothing is
retried and nothing is recovered mid-day.

*/

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    /// Invalid rates, sizes, or thread counts. Raised before any simulation starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A block task failed or panicked. The whole day is abandoned.
    #[error("worker for block {block} failed on day {day}: {message}")]
    WorkerFailure {
        day: u32,
        block: usize,
        message: String,
    },

    /// A self-check failed, e.g. the four state counts do not sum to N².
    #[error("consistency error: {0}")]
    Consistency(String),

    #[error("thread pool error: {0}")]
    ThreadPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SimError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        SimError::Configuration(message.into())
    }
}
