//! # vigil-core
//!
//! Core types, traits, configuration, and error handling for the Vigil
//! engagement watchdog.

pub mod config;
pub mod error;
pub mod message;
pub mod payload;
pub mod traits;
