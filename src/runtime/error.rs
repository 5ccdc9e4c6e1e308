#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("worker error: {0}")]
    Worker(String),
}
