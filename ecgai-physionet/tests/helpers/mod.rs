//! Test Helper Utilities
//!
//! Shared utilities for testing ecgai-physionet

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;

pub use fakes::{CountingSource, FakeBehavior, FakeSignalReader};
pub use fixtures::{test_ptbxl, test_ptbxl_with_reader, TestDataset};
