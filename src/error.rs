use thiserror::Error;

/// Failures surfaced by the flood-monitoring client.
///
/// An empty `items` array is not an error; callers see an empty `Vec`.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport failure, timeout, or a body that would not decode.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid measure id: {0:?}")]
    InvalidMeasureId(String),

    /// The background fetch thread hung up.
    #[error("fetch worker is not running")]
    WorkerGone,
}

impl FetchError {
    /// Message shown in place of the failed panel. `what` names the resource,
    /// e.g. "stations" or "readings". The text is the same for every variant;
    /// the detail goes to the log.
    pub fn user_message(&self, what: &str) -> String {
        format!("Failed to load {what}. Please try again later.")
    }
}
