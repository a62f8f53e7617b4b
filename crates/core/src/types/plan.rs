//! Billing plan catalog.
//!
//! Plans are keyed by a camelCase key (`hostedBasic`) while Shopify's
//! subscription records carry the display name (`HostedBasic`). A plan with
//! an [`S3Allowance`] stores files in the operator's bucket; a self-hosted
//! plan stores files in the merchant's own bucket.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::price::{CurrencyCode, Price};

/// Catalog key of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanKey {
    HostedBasic,
    SelfHosting,
}

/// Storage quota of an operator-hosted plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Allowance {
    pub storage_gb: u32,
    pub download_gb: u32,
    pub max_downloads: u32,
}

/// A subscription plan offered to merchants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub key: PlanKey,
    pub name: &'static str,
    /// Billing interval (`month`).
    pub frequency: &'static str,
    pub price: Price,
    pub s3: Option<S3Allowance>,
    pub self_hosted: bool,
    pub description: &'static str,
}

impl PlanKey {
    /// All plan keys in catalog order.
    pub const ALL: [Self; 2] = [Self::HostedBasic, Self::SelfHosting];

    /// Display name as stored on the Shopify subscription.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HostedBasic => "HostedBasic",
            Self::SelfHosting => "SelfHosting",
        }
    }

    /// Catalog key (`hostedBasic`).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::HostedBasic => "hostedBasic",
            Self::SelfHosting => "selfHosting",
        }
    }

    /// Resolve either a display name or a catalog key.
    #[must_use]
    pub fn lookup(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == value || k.key() == value)
    }

    /// Full plan definition.
    #[must_use]
    pub fn plan(self) -> Plan {
        match self {
            Self::HostedBasic => Plan {
                key: self,
                name: self.name(),
                frequency: "month",
                price: Price::from_cents(2999, CurrencyCode::CAD),
                s3: Some(S3Allowance {
                    storage_gb: 50,
                    download_gb: 50,
                    max_downloads: 50_000,
                }),
                self_hosted: false,
                description: "Files are stored and delivered from digiful's storage.",
            },
            Self::SelfHosting => Plan {
                key: self,
                name: self.name(),
                frequency: "month",
                price: Price::from_cents(999, CurrencyCode::CAD),
                s3: None,
                self_hosted: true,
                description: "Files are stored in your own S3 bucket.",
            },
        }
    }
}

impl fmt::Display for PlanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Plan {
    /// The full catalog in display order.
    #[must_use]
    pub fn catalog() -> Vec<Self> {
        PlanKey::ALL.into_iter().map(PlanKey::plan).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name_and_key() {
        assert_eq!(PlanKey::lookup("HostedBasic"), Some(PlanKey::HostedBasic));
        assert_eq!(PlanKey::lookup("selfHosting"), Some(PlanKey::SelfHosting));
        assert_eq!(PlanKey::lookup("Enterprise"), None);
    }

    #[test]
    fn test_self_hosted_plans_have_no_allowance() {
        for plan in Plan::catalog() {
            assert_eq!(plan.self_hosted, plan.s3.is_none(), "{}", plan.name);
        }
    }

    #[test]
    fn test_catalog_prices() {
        let catalog = Plan::catalog();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].price.amount_string(), "29.99");
        assert_eq!(catalog[1].price.amount_string(), "9.99");
    }
}
