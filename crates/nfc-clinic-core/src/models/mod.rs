//! Domain models for the clinic workstation.

mod audit;
mod patient;

pub use audit::*;
pub use patient::*;
