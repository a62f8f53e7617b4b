//! Business logic services for the merchant admin.
//!
//! # Services
//!
//! - `accounts` - Merchant account creation on first visit
//! - `products` - Digital product upload and listing
//! - `webhooks` - Webhook reconciliation with per-topic locks

pub mod accounts;
pub mod products;
pub mod webhooks;

pub use accounts::ensure_account;
pub use products::{
    AddProductOutcome, NewDigitalProduct, ProductError, ProductListing, ProductService,
    UploadedFile, storage_placement,
};
pub use webhooks::{
    RegistrationOutcome, RegistrationResult, SkipReason, UnsubscribeAllOutcome,
    UnsubscribeOutcome, WebhookError, WebhookLocks, WebhookReconciler,
};
