use thiserror::Error;

/// Failures at the boundary with the external collaborators.
///
/// None of these are fatal to the running session: the session layer converts
/// them into empty results before they reach the display layer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("analysis provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("request {0} timed out")]
    Timeout(String),

    #[error("reply channel closed for request {0}")]
    ChannelClosed(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether the failure is the kind that degrades to "no new data".
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::Timeout(_) | Self::ChannelClosed(_)
        )
    }
}
