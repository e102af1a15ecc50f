//! File content generators.

pub mod nfo;
