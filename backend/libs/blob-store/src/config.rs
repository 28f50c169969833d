/// S3 configuration for the attachment blob store
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Custom endpoint for S3-compatible storage (MinIO, LocalStack).
    /// When set, objects are addressed path-style under this endpoint.
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl S3Config {
    /// Load S3 configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            bucket: std::env::var("S3_BUCKET").unwrap_or_else(|_| "nova-attachments".to_string()),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: std::env::var("S3_ENDPOINT")
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
        }
    }

    /// Everything in an object URL up to and including the host marker.
    ///
    /// Virtual-hosted: `https://<bucket>.s3.<region>.amazonaws.com/`
    /// Path-style:     `<endpoint>/<bucket>/`
    pub fn url_prefix(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/", endpoint, self.bucket),
            None => format!("https://{}.s3.{}.amazonaws.com/", self.bucket, self.region),
        }
    }

    /// Build S3 object URL
    pub fn object_url(&self, key: &str) -> String {
        format!("{}{}", self.url_prefix(), key)
    }

    /// Strip the host marker from an object URL, leaving the key.
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(self.url_prefix().as_str())
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}
