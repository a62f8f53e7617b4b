//! digiful merchant admin library.
//!
//! The embedded Shopify app behind the digiful dashboard: OAuth install,
//! S3 settings, plan subscription, digital product upload and webhook
//! reconciliation. Exposed as a library so the binary, the CLI and the
//! integration tests share one implementation.
//!
//! # Security
//!
//! This crate holds offline Shopify access tokens and merchant S3
//! credentials. Secrets at rest are encrypted with [`crypto::CredentialCodec`];
//! secrets in memory are `SecretString` and never appear in `Debug` output.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
pub mod storage;
