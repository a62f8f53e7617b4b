//! Values kept in the browser session.

/// Session keys.
pub mod keys {
    /// Shop domain of the merchant using the app.
    pub const CURRENT_SHOP: &str = "current_shop";

    /// CSRF state of an OAuth install in progress.
    pub const OAUTH_STATE: &str = "oauth_state";
}
