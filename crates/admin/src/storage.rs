//! S3 object storage for digital product files.
//!
//! Each [`ObjectStore`] is bound to one bucket and one set of static
//! credentials: either the operator's (hosted plans) or a merchant's own
//! (self-hosted plan). Clients are built per request from those credentials.

use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::{ByteStream, ByteStreamError};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;

use crate::config::HostedStorageConfig;

/// Key written by the credentials test.
pub const CREDENTIALS_TEST_KEY: &str = "digiful-test-file_delete-me.txt";

/// Body written by the credentials test.
pub const CREDENTIALS_TEST_BODY: &str = "This file was created by digiful in order to test your S3 credentioals. You can delete this file.";

/// Errors from object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 {operation} failed for {key}: {source}")]
    Request {
        operation: &'static str,
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to read object body: {0}")]
    Body(#[from] ByteStreamError),
}

/// Bucket and credentials to talk to.
///
/// Implements `Debug` manually to redact the secret access key.
#[derive(Clone)]
pub struct S3Target {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

impl std::fmt::Debug for S3Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Target")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

impl From<&HostedStorageConfig> for S3Target {
    fn from(config: &HostedStorageConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            access_key_id: config.access_key_id.clone(),
            secret_access_key: config.secret_access_key.clone(),
        }
    }
}

/// An S3 client bound to one bucket.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    client: Client,
    bucket: String,
}

fn request_error<E>(operation: &'static str, key: &str, source: E) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageError::Request {
        operation,
        key: key.to_string(),
        source: Box::new(source),
    }
}

impl ObjectStore {
    /// Build a client for `target` with its static credentials.
    #[must_use]
    pub fn new(target: &S3Target) -> Self {
        let credentials = Credentials::new(
            &target.access_key_id,
            target.secret_access_key.expose_secret(),
            None,
            None,
            "digiful",
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(target.region.clone()))
            .credentials_provider(credentials)
            .build();

        Self {
            client: Client::from_conf(config),
            bucket: target.bucket.clone(),
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload an object with a `title` metadata entry. Returns the `ETag`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Request` if S3 rejects the upload.
    #[instrument(skip(self, body), fields(bucket = %self.bucket, size = body.len()))]
    pub async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        title: Option<&str>,
    ) -> Result<Option<String>, StorageError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type);
        if let Some(title) = title {
            request = request.metadata("title", title);
        }

        let output = request
            .send()
            .await
            .map_err(|e| request_error("put", key, e))?;
        Ok(output.e_tag)
    }

    /// Download an object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Request` if the object cannot be fetched and
    /// `StorageError::Body` if the stream fails.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| request_error("get", key, e))?;
        let bytes = output.body.collect().await?;
        Ok(bytes.into_bytes().to_vec())
    }

    /// Delete an object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Request` if S3 rejects the delete.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| request_error("delete", key, e))?;
        Ok(())
    }

    /// Write, read back and delete a probe object.
    ///
    /// # Errors
    ///
    /// Returns the first failing step.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn credentials_test(&self) -> Result<(), StorageError> {
        self.put(
            CREDENTIALS_TEST_KEY,
            CREDENTIALS_TEST_BODY.as_bytes().to_vec(),
            "text/plain",
            None,
        )
        .await?;
        self.get(CREDENTIALS_TEST_KEY).await?;
        self.delete(CREDENTIALS_TEST_KEY).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn target() -> S3Target {
        S3Target {
            bucket: "digiful-files".to_string(),
            region: "ca-central-1".to_string(),
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: SecretString::from("wJalrXUtnFEMI/K7MDENG"),
        }
    }

    #[test]
    fn test_target_debug_redacts_secret() {
        let output = format!("{:?}", target());
        assert!(output.contains("AKIAEXAMPLE"));
        assert!(!output.contains("wJalrXUtnFEMI"));
    }

    #[test]
    fn test_store_is_bound_to_bucket() {
        let store = ObjectStore::new(&target());
        assert_eq!(store.bucket(), "digiful-files");
    }

    #[tokio::test]
    #[ignore = "Requires S3_TEST_BUCKET, S3_TEST_REGION and AWS test credentials"]
    async fn test_live_credentials_test() {
        let target = S3Target {
            bucket: std::env::var("S3_TEST_BUCKET").unwrap(),
            region: std::env::var("S3_TEST_REGION").unwrap(),
            access_key_id: std::env::var("S3_TEST_ACCESS_KEY").unwrap(),
            secret_access_key: SecretString::from(
                std::env::var("S3_TEST_SECRET_ACCESS_KEY").unwrap(),
            ),
        };
        ObjectStore::new(&target).credentials_test().await.unwrap();
    }
}
