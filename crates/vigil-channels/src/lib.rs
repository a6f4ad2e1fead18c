//! # vigil-channels
//!
//! Outbound clients for Vigil: the Chaport chat platform (replies and event
//! resolution) and Telegram (human alerts).

pub mod chaport;
pub mod telegram;
pub mod utils;
