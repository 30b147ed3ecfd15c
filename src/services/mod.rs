//! External services.

pub mod cache;
pub mod resolver;
pub mod tmdb;
