//! External services and outbound channels.

pub mod metadata;
pub mod notifier;
pub mod tmdb;
