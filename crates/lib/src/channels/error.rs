//! Transport errors.

/// Failure to deliver or receive through a channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("channel api error: {0}")]
    Api(String),
    #[error("channel not configured: {0}")]
    NotConfigured(String),
    #[error("channel io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("send not supported by channel {0}")]
    Unsupported(String),
}
