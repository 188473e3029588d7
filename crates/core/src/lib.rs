//! Core types and shared functionality for umbra.
//!
//! This crate provides:
//! - Cache-generation store with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheEntry, CacheStore};
pub use config::WorkerConfig;
pub use error::Error;
