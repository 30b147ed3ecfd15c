//! Library Fixer
//!
//! Reorganizes movie and TV libraries into the layout media servers expect:
//! canonical folder and file names, one subtitle per language and flavor,
//! foreign subtitles removed, and empty folders cleaned up.

pub mod cli;
pub mod core;
pub mod error;
pub mod generators;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{Error, Result};
