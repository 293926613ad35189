mod error;
pub mod models;
pub mod ports;
pub mod services;
pub mod triage;

pub use error::*;
