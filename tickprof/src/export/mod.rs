//! Profile export functionality
//!
//! This module provides machine-readable exports of a session snapshot.
//! Currently supports pretty-printed JSON.

pub mod json;

pub use json::{JsonExporter, ProfileSnapshot};
