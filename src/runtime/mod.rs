mod error;
mod worker;

pub use error::RuntimeError;
pub use worker::{ReminderWorker, WorkerPool};
