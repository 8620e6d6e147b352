//! Common utilities shared across the encoder control crates.

#![warn(clippy::pedantic)]

/// Module for logging/tracing configuration
pub mod config;

/// Module for tracing subscriber setup
pub mod observability;

/// Module for secret types that prevent accidental logging
pub mod secret;
