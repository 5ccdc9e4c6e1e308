use libsql::errors::Error as TursoError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Turso error: {0}")]
    Turso(#[from] TursoError),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Export error: {0}")]
    Export(String),
}
