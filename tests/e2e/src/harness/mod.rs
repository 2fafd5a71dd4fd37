//! Test harness

mod environment_manager;

pub use environment_manager::EnvironmentHarness;
