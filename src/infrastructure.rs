//! Infrastructure layer
//!
//! This module handles external integrations:
//! - REST adapter for the Art Cafe API
//! - Session token storage
//! - Configuration and CLI argument processing

pub mod api;
pub mod cli;
pub mod config;
pub mod session;
