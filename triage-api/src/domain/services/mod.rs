mod batch;
mod triage;

pub use batch::{BatchTriageService, DEFAULT_BATCH_WORKERS};
pub use triage::TriageServiceImpl;
