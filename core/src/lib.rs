//! Core components for the stowage blob-storage access layer.
//!
//! This crate provides the foundational types for the stowage ecosystem.
//! Service crates build on top of it to talk to a concrete object store.
//!
//! ## Overview
//!
//! The crate is built around a few key concepts:
//!
//! - **Context**: a container holding pluggable implementations for file
//!   reading and writing, HTTP sending, and environment access. Service
//!   crates never touch the filesystem or the network directly; they go
//!   through the context, so tests can substitute fakes without a real
//!   network boundary.
//! - **Error**: one error type shared across the ecosystem, with a kind
//!   for every failure class a caller may want to branch on.
//! - **SigningRequest**: a decomposed view of `http::request::Parts` that
//!   signers mutate and reapply.
//!
//! ## Utilities
//!
//! - [`hash`]: base64 and HMAC helpers used by request signing
//! - [`time`]: timestamp formatting for wire headers and SAS tokens
//! - [`utils`]: general utilities including secret redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::Context;
mod fs;
pub use fs::{FileRead, FileWrite};
mod http;
pub use http::HttpSend;
mod env;
pub use env::{Env, OsEnv, StaticEnv};

mod error;
pub use error::{Error, ErrorKind, Result};
mod request;
pub use request::SigningRequest;
