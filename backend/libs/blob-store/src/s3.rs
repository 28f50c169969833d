/// S3-backed blob store
///
/// Credentials and bucket come from an explicit `S3Config`; the client is
/// built once at startup and shared behind an `Arc`.
use crate::config::S3Config;
use crate::error::BlobStoreError;
use crate::BlobStore;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::sync::Arc;

/// Cache-Control for uploaded attachments: keys are never reused, so objects are immutable.
const ATTACHMENT_CACHE_CONTROL: &str = "max-age=31536000";

#[derive(Clone)]
pub struct S3BlobStore {
    client: Arc<Client>,
    config: S3Config,
}

impl S3BlobStore {
    /// Wrap an existing client
    pub fn new(client: Client, config: S3Config) -> Self {
        Self {
            client: Arc::new(client),
            config,
        }
    }

    /// Build an AWS S3 client from config and wrap it.
    ///
    /// Explicit access keys take precedence; otherwise the default credential
    /// chain (env, profile, IAM role) is used.
    pub async fn connect(config: S3Config) -> Self {
        use aws_sdk_s3::config::Region;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            use aws_sdk_s3::config::Credentials;

            let credentials = Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "posting_service_s3",
            );
            loader = loader.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "S3 blob store initialized"
        );

        Self::new(Client::from_conf(s3_config), config)
    }

    /// Get S3 configuration
    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Health check for S3 connectivity and bucket access
    pub async fn health_check(&self) -> Result<(), BlobStoreError> {
        match self
            .client
            .list_objects_v2()
            .bucket(&self.config.bucket)
            .max_keys(1)
            .send()
            .await
        {
            Ok(_) => {
                tracing::debug!(bucket = %self.config.bucket, "S3 connection validated");
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                if message.contains("NoSuchBucket") {
                    Err(BlobStoreError::BucketNotFound(self.config.bucket.clone()))
                } else if message.contains("AccessDenied") || message.contains("InvalidAccessKeyId") {
                    Err(BlobStoreError::AuthFailed)
                } else {
                    Err(BlobStoreError::Unavailable(message))
                }
            }
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, BlobStoreError> {
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .cache_control(ATTACHMENT_CACHE_CONTROL)
            .send()
            .await
            .map_err(|e| {
                let message = e.to_string();
                if message.contains("403") || message.contains("Forbidden") {
                    BlobStoreError::AuthFailed
                } else if message.contains("NoSuchBucket") {
                    BlobStoreError::BucketNotFound(self.config.bucket.clone())
                } else {
                    BlobStoreError::PutFailed {
                        key: key.to_string(),
                        message,
                    }
                }
            })?;

        tracing::debug!(%key, size, content_type, "blob uploaded");

        Ok(self.config.object_url(key))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let message = e.to_string();
                if message.contains("403") || message.contains("Forbidden") {
                    BlobStoreError::AuthFailed
                } else {
                    BlobStoreError::DeleteFailed {
                        key: key.to_string(),
                        message,
                    }
                }
            })?;

        tracing::debug!(%key, "blob deleted");

        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        self.config.object_url(key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        self.config.key_from_url(url)
    }
}
