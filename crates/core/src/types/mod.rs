//! Core types for digiful.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod plan;
pub mod price;
pub mod secret;
pub mod shop;
pub mod status;
pub mod webhook;

pub use id::*;
pub use plan::{Plan, PlanKey, S3Allowance};
pub use price::{CurrencyCode, Price};
pub use secret::EncryptedSecret;
pub use shop::{ShopDomain, ShopDomainError};
pub use status::*;
pub use webhook::{UnknownWebhookName, WebhookTopic};
