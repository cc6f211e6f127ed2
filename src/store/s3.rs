//! S3 object store backend

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

use super::{ListPage, ObjectMetadata, ObjectStore};
use crate::error::{MirrorError, Result};

/// Object store backed by S3 or an S3-compatible endpoint
pub struct S3Store {
    client: S3Client,
}

impl S3Store {
    /// Load credentials from the default provider chain
    ///
    /// `endpoint_url` switches to path-style addressing against an
    /// S3-compatible service (MinIO, R2, localstack).
    pub async fn connect(region: &str, endpoint_url: Option<&str>) -> Result<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: S3Client::from_conf(builder.build()),
        })
    }

    /// Wrap an existing client
    pub fn from_client(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(&self, bucket: &str, prefix: &str, token: Option<&str>) -> Result<ListPage> {
        let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
        if let Some(token) = token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MirrorError::Store(format!("list s3://{}/{}: {}", bucket, prefix, e)))?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(String::from))
            .collect();

        let next_token = next_page_token(
            response.is_truncated() == Some(true),
            response.next_continuation_token(),
        )
        .map_err(|e| MirrorError::Store(format!("list s3://{}/{}: {}", bucket, prefix, e)))?;

        Ok(ListPage { keys, next_token })
    }

    async fn head_metadata(&self, bucket: &str, key: &str) -> Result<Option<ObjectMetadata>> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => Ok(Some(ObjectMetadata {
                size: output.content_length().unwrap_or(0).max(0) as u64,
                content_type: output.content_type().map(String::from),
                user_metadata: output.metadata().cloned().unwrap_or_default(),
            })),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(None)
                } else {
                    Err(MirrorError::Store(format!(
                        "head s3://{}/{}: {}",
                        bucket, key, service_error
                    )))
                }
            }
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()> {
        let size = body.len();
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body));

        for (k, v) in metadata {
            request = request.metadata(k, v);
        }

        request
            .send()
            .await
            .map_err(|e| MirrorError::Store(format!("put s3://{}/{}: {}", bucket, key, e)))?;

        tracing::info!("Uploaded {} bytes to s3://{}/{}", size, bucket, key);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| MirrorError::Store(format!("delete s3://{}/{}: {}", bucket, key, e)))?;

        tracing::info!("Deleted s3://{}/{}", bucket, key);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| MirrorError::Store(format!("get s3://{}/{}: {}", bucket, key, e)))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| MirrorError::Store(e.to_string()))?
            .into_bytes();

        Ok(data.to_vec())
    }
}

/// Token for the next page; a truncated page without one cannot be resumed
fn next_page_token(truncated: bool, token: Option<&str>) -> std::result::Result<Option<String>, &'static str> {
    match (truncated, token) {
        (true, Some(token)) => Ok(Some(token.to_string())),
        (true, None) => Err("listing truncated without a continuation token"),
        (false, _) => Ok(None),
    }
}
