//! Scenario fixtures

mod fixtures;

pub use fixtures::{Scenario, ScenarioFactory};
