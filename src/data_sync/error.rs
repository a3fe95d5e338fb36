use thiserror::Error;

/// Every failure the sync layer can run into.
///
/// None of these reach the consumer: the pull path degrades to the default
/// snapshot and the push path drops the frame or schedules a reconnect.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no {0} endpoint configured")]
    ConfigurationAbsent(&'static str),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("decode failure: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Transport(format!("undecodable response body: {}", error))
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(error.to_string())
    }
}
