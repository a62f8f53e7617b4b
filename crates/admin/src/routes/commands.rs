//! Typed `actionType` commands posted by the embedded frontend.
//!
//! Each form is parsed into a command enum at the boundary; handlers match
//! on the enum and never see the raw action string.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use digiful_core::WebhookTopic;

use crate::error::AppError;

/// Why a posted form could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unknown actionType: {0}")]
    UnknownAction(String),
}

impl From<CommandError> for AppError {
    fn from(err: CommandError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, CommandError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(CommandError::MissingField(field))
}

/// A command response tagged with the action that produced it.
#[derive(Debug, Serialize)]
pub struct ActionResponse<T> {
    pub action: &'static str,
    #[serde(flatten)]
    pub result: T,
}

// =============================================================================
// POST /app
// =============================================================================

/// Commands of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCommand {
    RegisterWebhook(WebhookTopic),
    GetAllDigitalProducts,
    AddNewDigitalProduct,
}

impl IndexCommand {
    /// Parse the `actionType` field.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` or `UnknownAction`.
    pub fn parse(action_type: Option<&str>) -> Result<Self, CommandError> {
        match required(action_type, "actionType")? {
            "registerOrdersPaidWebhook" => Ok(Self::RegisterWebhook(WebhookTopic::OrdersPaid)),
            "registerAppSubscriptionUpdateWebhook" => {
                Ok(Self::RegisterWebhook(WebhookTopic::AppSubscriptionsUpdate))
            }
            "registerAppUninstalledWebhook" => {
                Ok(Self::RegisterWebhook(WebhookTopic::AppUninstalled))
            }
            "getAllDigitalProductsFromShop" => Ok(Self::GetAllDigitalProducts),
            "addNewDigitalProduct" => Ok(Self::AddNewDigitalProduct),
            other => Err(CommandError::UnknownAction(other.to_string())),
        }
    }

    /// The `actionType` this command was parsed from.
    #[must_use]
    pub const fn action_type(self) -> &'static str {
        match self {
            Self::RegisterWebhook(WebhookTopic::OrdersPaid) => "registerOrdersPaidWebhook",
            Self::RegisterWebhook(WebhookTopic::AppSubscriptionsUpdate) => {
                "registerAppSubscriptionUpdateWebhook"
            }
            Self::RegisterWebhook(WebhookTopic::AppUninstalled) => "registerAppUninstalledWebhook",
            Self::GetAllDigitalProducts => "getAllDigitalProductsFromShop",
            Self::AddNewDigitalProduct => "addNewDigitalProduct",
        }
    }
}

// =============================================================================
// POST /app/settings
// =============================================================================

/// Raw settings form. Older frontends post `s3secretAccessKey` and
/// `s3bucketName`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsForm {
    pub action_type: Option<String>,
    pub s3_access_key_id: Option<String>,
    #[serde(alias = "s3secretAccessKey")]
    pub s3_secret_access_key: Option<String>,
    #[serde(alias = "s3bucketName")]
    pub s3_bucket_name: Option<String>,
    pub s3_region: Option<String>,
}

/// Credentials posted by `saveS3Settings`, still in plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct S3CredentialsInput {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub region: String,
}

impl std::fmt::Debug for S3CredentialsInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3CredentialsInput")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .finish()
    }
}

/// Commands of the settings page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsCommand {
    SaveS3Settings(S3CredentialsInput),
    S3CredsTest,
}

impl SettingsCommand {
    /// Parse and validate the settings form.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` for an absent action or credential field and
    /// `UnknownAction` for any other action.
    pub fn parse(form: &SettingsForm) -> Result<Self, CommandError> {
        match required(form.action_type.as_deref(), "actionType")? {
            "saveS3Settings" => Ok(Self::SaveS3Settings(S3CredentialsInput {
                access_key_id: required(form.s3_access_key_id.as_deref(), "s3AccessKeyId")?
                    .to_string(),
                secret_access_key: required(
                    form.s3_secret_access_key.as_deref(),
                    "s3SecretAccessKey",
                )?
                .to_string(),
                bucket_name: required(form.s3_bucket_name.as_deref(), "s3BucketName")?
                    .to_string(),
                region: required(form.s3_region.as_deref(), "s3Region")?.to_string(),
            })),
            "s3CredsTest" => Ok(Self::S3CredsTest),
            other => Err(CommandError::UnknownAction(other.to_string())),
        }
    }

    #[must_use]
    pub const fn action_type(&self) -> &'static str {
        match self {
            Self::SaveS3Settings(_) => "saveS3Settings",
            Self::S3CredsTest => "s3CredsTest",
        }
    }
}

// =============================================================================
// POST /app/unsubscribe-webhook
// =============================================================================

/// Raw unsubscribe form.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeForm {
    pub action_type: Option<String>,
    pub webhook_name: Option<String>,
}

/// Commands of the webhook maintenance endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeCommand {
    Unsubscribe(WebhookTopic),
    /// A `webhookName` this app never registers; nothing is cached under it.
    UnsubscribeUnmanaged,
    UnsubscribeAll,
}

impl UnsubscribeCommand {
    /// Parse the form, resolving `webhookName` to a topic.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` for a missing field or unknown action.
    pub fn parse(form: &UnsubscribeForm) -> Result<Self, CommandError> {
        match required(form.action_type.as_deref(), "actionType")? {
            "unsubscribeWebhooks" => {
                let name = required(form.webhook_name.as_deref(), "webhookName")?;
                Ok(WebhookTopic::from_record_key(name)
                    .map_or(Self::UnsubscribeUnmanaged, Self::Unsubscribe))
            }
            "unsubscribeAllWebhooks" => Ok(Self::UnsubscribeAll),
            other => Err(CommandError::UnknownAction(other.to_string())),
        }
    }

    #[must_use]
    pub const fn action_type(self) -> &'static str {
        match self {
            Self::Unsubscribe(_) | Self::UnsubscribeUnmanaged => "unsubscribeWebhooks",
            Self::UnsubscribeAll => "unsubscribeAllWebhooks",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_index_command_round_trips_action_type() {
        for action in [
            "registerOrdersPaidWebhook",
            "registerAppSubscriptionUpdateWebhook",
            "registerAppUninstalledWebhook",
            "getAllDigitalProductsFromShop",
            "addNewDigitalProduct",
        ] {
            assert_eq!(IndexCommand::parse(Some(action)).unwrap().action_type(), action);
        }
    }

    #[test]
    fn test_index_command_errors() {
        assert_eq!(
            IndexCommand::parse(None),
            Err(CommandError::MissingField("actionType"))
        );
        assert_eq!(
            IndexCommand::parse(Some("dropDatabase")),
            Err(CommandError::UnknownAction("dropDatabase".to_string()))
        );
    }

    #[test]
    fn test_settings_form_accepts_legacy_field_names() {
        let form: SettingsForm = serde_json::from_value(serde_json::json!({
            "actionType": "saveS3Settings",
            "s3AccessKeyId": "AKIAEXAMPLE",
            "s3secretAccessKey": "shh",
            "s3bucketName": "files",
            "s3Region": "ca-central-1"
        }))
        .unwrap();

        let SettingsCommand::SaveS3Settings(input) = SettingsCommand::parse(&form).unwrap() else {
            panic!("expected saveS3Settings");
        };
        assert_eq!(input.secret_access_key, "shh");
        assert_eq!(input.bucket_name, "files");
        assert!(!format!("{input:?}").contains("shh"));
    }

    #[test]
    fn test_settings_save_requires_every_field() {
        let form = SettingsForm {
            action_type: Some("saveS3Settings".to_string()),
            s3_access_key_id: Some("AKIAEXAMPLE".to_string()),
            s3_secret_access_key: Some("  ".to_string()),
            ..SettingsForm::default()
        };
        assert_eq!(
            SettingsCommand::parse(&form),
            Err(CommandError::MissingField("s3SecretAccessKey"))
        );
    }

    #[test]
    fn test_unsubscribe_command() {
        let form = UnsubscribeForm {
            action_type: Some("unsubscribeWebhooks".to_string()),
            webhook_name: Some("webhookAppUninstalled".to_string()),
        };
        assert_eq!(
            UnsubscribeCommand::parse(&form).unwrap(),
            UnsubscribeCommand::Unsubscribe(WebhookTopic::AppUninstalled)
        );

        let form = UnsubscribeForm {
            action_type: Some("unsubscribeWebhooks".to_string()),
            webhook_name: Some("webhookOrdersCancelled".to_string()),
        };
        assert_eq!(
            UnsubscribeCommand::parse(&form).unwrap(),
            UnsubscribeCommand::UnsubscribeUnmanaged
        );

        let form = UnsubscribeForm {
            action_type: Some("unsubscribeAllWebhooks".to_string()),
            webhook_name: None,
        };
        assert_eq!(
            UnsubscribeCommand::parse(&form).unwrap(),
            UnsubscribeCommand::UnsubscribeAll
        );
    }
}
