//! Media Library
//!
//! Scans local video folders, resolves each file against TMDB and writes
//! poster, fanart and a Kodi NFO next to it. Progress is exposed through an
//! HTTP API with a Server-Sent Events push channel.

pub mod cli;
pub mod core;
pub mod error;
pub mod generators;
pub mod models;
pub mod preflight;
pub mod server;
pub mod services;
pub mod utils;

pub use error::{Error, Result};
