use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("missing required argument '{0}'")]
    MissingArg(String),

    #[error("argument '{0}' has wrong type, expected {1}")]
    WrongArgType(String, &'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zmq error: {0}")]
    Zmq(#[from] zmq::Error),

    #[error("msgpack decode error: {0}")]
    Msgpack(#[from] rmp_serde::decode::Error),
}
