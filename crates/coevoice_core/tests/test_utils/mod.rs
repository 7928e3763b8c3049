//! Test utilities for coevoice tests.
//!
//! This module provides an in-memory platform and a ready-made guild.

pub mod mock_platform;

#[allow(unused_imports)]
pub use mock_platform::{Call, MemoryStore, MockPlatform, engine, engine_with, fixture};
