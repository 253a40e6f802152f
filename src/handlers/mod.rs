pub mod plans;
pub mod progress;
