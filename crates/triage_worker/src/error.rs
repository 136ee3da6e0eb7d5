use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("unknown module '{0}' in its registry partition")]
    UnknownModule(String),

    #[error("module '{0}' is reserved and cannot be publicly registered")]
    ReservedModule(String),

    #[error("module '{0}' already registered")]
    AlreadyRegistered(String),

    #[error("construction failed for module '{0}': {1}")]
    Construction(String, String),

    #[error("queue error: {0}")]
    Queue(#[from] triage_queue::QueueError),
}
