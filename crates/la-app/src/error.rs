use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error from backend: {0}")]
    BackendError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Worker unavailable: {0}")]
    WorkerError(String),
}
