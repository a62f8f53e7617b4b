//! Scripted in-memory `WebhookApi` for tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use digiful_core::{WebhookSubscriptionId, WebhookTopic};

use super::{
    AdminShopifyError, WebhookApi,
    types::{CreatedWebhook, RemoteWebhook, UserError, WebhookCreateOutcome, WebhookDeleteOutcome},
};

/// Timestamp stamped on every subscription the fake creates.
pub const FAKE_CREATED_AT: &str = "2025-01-01T00:00:00Z";

/// In-memory stand-in for the platform's webhook endpoints.
///
/// Created subscriptions are added to the remote list, so a second
/// reconciliation sees the first one. Responses can be scripted per call.
#[derive(Debug, Default)]
pub struct FakeWebhookApi {
    state: Mutex<FakeState>,
}

#[derive(Debug, Default)]
struct FakeState {
    remote: Vec<RemoteWebhook>,
    next_id: u64,
    create_errors: Option<Vec<UserError>>,
    delete_echo: Option<Option<WebhookSubscriptionId>>,
    list_failure: Option<AdminShopifyError>,
    list_calls: usize,
    create_calls: usize,
    delete_calls: Vec<WebhookSubscriptionId>,
}

impl FakeWebhookApi {
    /// An empty remote with ids starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the remote listing.
    #[must_use]
    pub fn with_remote(self, remote: Vec<RemoteWebhook>) -> Self {
        self.state().remote = remote;
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer the next create with these user errors and no subscription.
    pub fn reject_next_create(&self, errors: Vec<UserError>) {
        self.state().create_errors = Some(errors);
    }

    /// Echo `id` from every following delete instead of the requested id.
    pub fn echo_on_delete(&self, id: Option<WebhookSubscriptionId>) {
        self.state().delete_echo = Some(id);
    }

    /// Fail the next listing with `error`.
    pub fn fail_next_list(&self, error: AdminShopifyError) {
        self.state().list_failure = Some(error);
    }

    /// Current remote subscriptions.
    #[must_use]
    pub fn remote(&self) -> Vec<RemoteWebhook> {
        self.state().remote.clone()
    }

    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.state().create_calls
    }

    /// Ids passed to delete, in call order.
    #[must_use]
    pub fn delete_calls(&self) -> Vec<WebhookSubscriptionId> {
        self.state().delete_calls.clone()
    }
}

#[async_trait]
impl WebhookApi for FakeWebhookApi {
    async fn list_webhooks(&self) -> Result<Vec<RemoteWebhook>, AdminShopifyError> {
        let mut state = self.state();
        state.list_calls += 1;
        if let Some(error) = state.list_failure.take() {
            return Err(error);
        }
        Ok(state.remote.clone())
    }

    async fn create_webhook(
        &self,
        topic: WebhookTopic,
        callback_url: &str,
    ) -> Result<WebhookCreateOutcome, AdminShopifyError> {
        let mut state = self.state();
        state.create_calls += 1;

        if let Some(user_errors) = state.create_errors.take() {
            return Ok(WebhookCreateOutcome {
                webhook_subscription: None,
                user_errors,
            });
        }

        state.next_id += 1;
        let id = WebhookSubscriptionId::new(format!(
            "gid://shopify/WebhookSubscription/{}",
            state.next_id
        ));
        state.remote.push(RemoteWebhook {
            id: id.clone(),
            topic: topic.as_graphql().to_string(),
            callback_url: Some(callback_url.to_string()),
        });

        Ok(WebhookCreateOutcome {
            webhook_subscription: Some(CreatedWebhook {
                id,
                topic: topic.as_graphql().to_string(),
                created_at: FAKE_CREATED_AT.to_string(),
            }),
            user_errors: Vec::new(),
        })
    }

    async fn delete_webhook(
        &self,
        id: &WebhookSubscriptionId,
    ) -> Result<WebhookDeleteOutcome, AdminShopifyError> {
        let mut state = self.state();
        state.delete_calls.push(id.clone());

        let existed = state.remote.iter().any(|hook| &hook.id == id);
        state.remote.retain(|hook| &hook.id != id);

        if let Some(echo) = state.delete_echo.clone() {
            return Ok(WebhookDeleteOutcome {
                deleted_webhook_subscription_id: echo,
                user_errors: Vec::new(),
            });
        }

        if existed {
            Ok(WebhookDeleteOutcome {
                deleted_webhook_subscription_id: Some(id.clone()),
                user_errors: Vec::new(),
            })
        } else {
            Ok(WebhookDeleteOutcome {
                deleted_webhook_subscription_id: None,
                user_errors: vec![UserError {
                    field: Some(vec!["id".to_string()]),
                    message: "Webhook subscription does not exist".to_string(),
                }],
            })
        }
    }
}
