//! Shared utilities.

pub mod fs;
pub mod hash;
pub mod language;
