mod batch;
mod triage;

pub use batch::*;
pub use triage::*;
