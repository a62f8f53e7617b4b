//! Domain models for the admin service.
//!
//! Documents in the store are camelCase JSON; these types are their typed
//! view. Unknown fields are ignored on read and left untouched on write,
//! because writes go through path updates rather than whole-document saves.

pub mod merchant;
pub mod product;
pub mod session;

pub use merchant::{
    MerchantAccount, PlanRecord, S3Settings, WebhookEntry, WebhookRegistration, shop_prefix_hash,
};
pub use product::{DigitalProductRecord, FileInfo, FileVersion, VariantRecord};
pub use session::keys as session_keys;
