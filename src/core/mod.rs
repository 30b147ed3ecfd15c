//! Core business logic modules.

pub mod batch;
pub mod detector;
pub mod executor;
pub mod planner;
pub mod scanner;
pub mod subtitles;
