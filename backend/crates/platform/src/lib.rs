//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Client address extraction from forwarding headers
//! - Rate limit policy values shared by the limiter and the config layer
//! - JSON configuration file loading

pub mod client;
pub mod config;
pub mod rate_limit;
