//! Background services.

pub mod run_janitor;

pub use run_janitor::RunJanitor;
