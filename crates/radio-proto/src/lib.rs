//! Shared data model for the world radio player and relay.

pub mod config;
pub mod filter;
pub mod platform;
pub mod protocol;
