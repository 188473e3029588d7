//! SQLite-backed store for named cache generations.
//!
//! This module provides a persistent request/response cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named generations, deleted wholesale when superseded
//! - Request-identity keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheStore;
pub use entries::CacheEntry;
