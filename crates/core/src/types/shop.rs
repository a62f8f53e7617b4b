//! Shop domain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input does not end with `.myshopify.com`.
    #[error("shop domain must end with {suffix}")]
    WrongSuffix {
        /// Required suffix.
        suffix: &'static str,
    },
    /// The shop handle contains characters other than letters, digits and `-`.
    #[error("shop handle contains invalid characters")]
    InvalidHandle,
}

/// A `*.myshopify.com` shop domain.
///
/// OAuth redirects and API endpoints are built from this value, so it is
/// validated strictly: the handle must be non-empty, start with a letter or
/// digit, and contain only ASCII letters, digits and `-`.
///
/// ## Examples
///
/// ```
/// use digiful_core::ShopDomain;
///
/// let shop = ShopDomain::parse("my-store.myshopify.com").unwrap();
/// assert_eq!(shop.slug(), "my-store");
///
/// assert!(ShopDomain::parse("evil.com").is_err());
/// assert!(ShopDomain::parse("a.b.myshopify.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Required domain suffix.
    pub const SUFFIX: &'static str = ".myshopify.com";

    /// Parse a `ShopDomain` from a string. Input is lowercased first.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, lacks the `.myshopify.com`
    /// suffix, or the handle contains invalid characters.
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        let s = s.trim().to_ascii_lowercase();
        if s.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        let handle = s
            .strip_suffix(Self::SUFFIX)
            .ok_or(ShopDomainError::WrongSuffix {
                suffix: Self::SUFFIX,
            })?;

        let valid = handle
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
            && handle
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(ShopDomainError::InvalidHandle);
        }

        Ok(Self(s))
    }

    /// Returns the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the shop handle without the `.myshopify.com` suffix.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.0.strip_suffix(Self::SUFFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = ShopDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(domain: ShopDomain) -> Self {
        domain.0
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
