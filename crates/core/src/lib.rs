//! digiful Core - Shared types library.
//!
//! This crate provides the domain types used across the digiful components:
//! - `admin` - The embedded merchant admin service
//! - `cli` - Command-line tools for migrations and key management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Shop identifiers, webhook topics, encrypted secrets, prices,
//!   the plan catalog and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
