//! Integration tests for the Stagehand orchestration core

mod checkpoint_store;
mod config_integration;
mod orchestrator_turns;
mod test_utils;
