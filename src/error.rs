use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("app not found")]
    AppNotFound,

    #[error("subscription not found")]
    SubscriptionNotFound,

    #[error("channel error: {0}")]
    Channel(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid message format: {0}")]
    InvalidMessageFormat(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
