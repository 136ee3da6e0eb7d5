use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatcherError>;

#[derive(Error, Debug)]
pub enum DispatcherError {
    #[error("module construction failed: {0}")]
    Construction(#[from] anyhow::Error),

    #[error("worker error: {0}")]
    Worker(#[from] triage_worker::WorkerError),

    #[error("queue error: {0}")]
    Queue(#[from] triage_queue::QueueError),
}
