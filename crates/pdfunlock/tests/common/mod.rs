//! Shared test utilities for pdfunlock integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp directories and a private error log
//! - Builders for PDF fixtures (plain and encrypted) and configurations

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{drain_events, ScriptedPrompt, TestHarness};
