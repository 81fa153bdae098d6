//! # Core Runtime Module
//!
//! Provides the runtime infrastructure shared by the decoder core and the
//! command-line front-end:
//! - Logging and tracing infrastructure
//! - Runtime error type
//!
//! ## Overview
//!
//! This crate establishes the logging conventions used throughout the
//! workspace. Everything here is synchronous; the decode pipeline is a single
//! blocking loop and needs no executor.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
