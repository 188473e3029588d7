//! Network client for umbra.
//!
//! This crate provides the HTTP fetch pipeline used by the worker for
//! install-time precaching and runtime pass-through fetches.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Method, Network, StatusCode};
