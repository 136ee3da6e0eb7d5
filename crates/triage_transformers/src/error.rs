use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransformError>;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("missing required argument '{0}'")]
    MissingArg(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
