//! Status enums for merchants, subscriptions and products.

use serde::{Deserialize, Serialize};

/// Lifecycle of a merchant account. Accounts are archived, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AccountStatus {
    #[default]
    Active,
    Archived,
}

/// Status of a Shopify app subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Declined,
    Expired,
    Frozen,
    Pending,
    Accepted,
    #[serde(other)]
    Unknown,
}

/// Status of a Shopify product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Active,
    #[default]
    Draft,
    Archived,
}

impl ProductStatus {
    /// New digital products are published as active or kept as drafts.
    #[must_use]
    pub const fn from_active_flag(active: bool) -> Self {
        if active { Self::Active } else { Self::Draft }
    }

    /// GraphQL `ProductStatus` enum value.
    #[must_use]
    pub const fn as_graphql(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Draft => "DRAFT",
            Self::Archived => "ARCHIVED",
        }
    }
}
