//! Core business logic modules.

pub mod coordinator;
pub mod scanner;
pub mod scheduler;
pub mod store;
