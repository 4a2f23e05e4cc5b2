//! Shared test utilities for patentflow integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with a temp database and archive cache
//! - `ScriptedProvider` and dataset builders for deterministic scenarios

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
