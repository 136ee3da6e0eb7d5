use thiserror::Error;

pub type Result<T> = std::result::Result<T, SinkError>;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("missing required argument '{0}'")]
    MissingArg(String),

    #[error("invalid logging level '{0}'")]
    InvalidLogLevel(String),

    #[error(transparent)]
    Protocol(#[from] triage_protocol::ProtocolError),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
