use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReolinkError {
    #[error("Authentication error: wrong username or password")]
    AuthFailure,

    #[error("Session expired")]
    SessionExpired,

    #[error("No monitor point configured on channel {0}")]
    NoMonitorPoint(u8),

    #[error("Logout is in progress")]
    LogoutInProgress,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Channel {0} appears to be offline")]
    ChannelOffline(String),

    #[error("Device error {code}: {detail}")]
    Command { code: i32, detail: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, ReolinkError>;
