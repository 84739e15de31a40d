//! S3 object storage.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ErrorDocument, IndexDocument,
    ObjectIdentifier, PublicAccessBlockConfiguration, WebsiteConfiguration,
};
use tracing::{debug, trace};

use crate::error::{ProviderError, Result};
use crate::provider::traits::ObjectStorage;
use crate::provider::types::{ObjectUpload, PublicAccess};

use super::{build_error, request_error, resource_error};

const SERVICE: &str = "s3";

/// `us-east-1` rejects an explicit location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Maximum keys per `DeleteObjects` request.
const DELETE_BATCH: usize = 1000;

/// S3-backed [`ObjectStorage`].
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    /// Creates the storage client.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    async fn delete_batch(&self, bucket: &str, objects: Vec<ObjectIdentifier>) -> Result<()> {
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| build_error(SERVICE, e))?;

        let output = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "DeleteObjects", e))?;

        if let Some(failed) = output.errors().first() {
            return Err(ProviderError::request(
                SERVICE,
                "DeleteObjects",
                format!(
                    "{}: {}",
                    failed.key().unwrap_or("<unknown key>"),
                    failed.message().unwrap_or("unknown error")
                ),
            )
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(request_error(SERVICE, "HeadBucket", service_err))
                }
            }
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "CreateBucket", e))?;

        debug!("Created bucket {bucket} in {region}");
        Ok(())
    }

    async fn set_public_access(&self, bucket: &str, access: PublicAccess) -> Result<()> {
        let blocked = access.blocked();
        let config = PublicAccessBlockConfiguration::builder()
            .block_public_acls(blocked)
            .ignore_public_acls(blocked)
            .block_public_policy(blocked)
            .restrict_public_buckets(blocked)
            .build();

        self.client
            .put_public_access_block()
            .bucket(bucket)
            .public_access_block_configuration(config)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "PutPublicAccessBlock", e))?;
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        trace!("Bucket policy for {bucket}: {policy}");
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "PutBucketPolicy", e))?;
        Ok(())
    }

    async fn enable_website(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> Result<()> {
        let index = IndexDocument::builder()
            .suffix(index_document)
            .build()
            .map_err(|e| build_error(SERVICE, e))?;
        let error = ErrorDocument::builder()
            .key(error_document)
            .build()
            .map_err(|e| build_error(SERVICE, e))?;
        let website = WebsiteConfiguration::builder()
            .index_document(index)
            .error_document(error)
            .build();

        self.client
            .put_bucket_website()
            .bucket(bucket)
            .website_configuration(website)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "PutBucketWebsite", e))?;
        Ok(())
    }

    async fn disable_website(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket_website()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "DeleteBucketWebsite", e))?;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, object: &ObjectUpload) -> Result<()> {
        let body = ByteStream::from_path(&object.path).await.map_err(|e| {
            ProviderError::request(
                SERVICE,
                "PutObject",
                format!("{}: {e}", object.path.display()),
            )
        })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(&object.key)
            .body(body)
            .content_type(&object.content_type)
            .set_cache_control(object.cache_control.clone())
            .send()
            .await
            .map_err(|e| request_error(SERVICE, "PutObject", e))?;

        trace!("Uploaded s3://{bucket}/{}", object.key);
        Ok(())
    }

    async fn delete_all_versions(&self, bucket: &str) -> Result<usize> {
        let mut deleted = 0;
        let mut key_marker: Option<String> = None;
        let mut version_marker: Option<String> = None;

        loop {
            let page = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_marker.take())
                .send()
                .await
                .map_err(|e| {
                    resource_error(
                        SERVICE,
                        "ListObjectVersions",
                        "S3 bucket",
                        bucket,
                        &["NoSuchBucket"],
                        e,
                    )
                })?;

            let versions = page.versions().iter().map(|v| (v.key(), v.version_id()));
            let markers = page
                .delete_markers()
                .iter()
                .map(|m| (m.key(), m.version_id()));

            let identifiers = versions
                .chain(markers)
                .filter_map(|(key, version)| {
                    key.map(|key| {
                        ObjectIdentifier::builder()
                            .key(key)
                            .set_version_id(version.map(str::to_string))
                            .build()
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| build_error(SERVICE, e))?;

            for batch in identifiers.chunks(DELETE_BATCH) {
                self.delete_batch(bucket, batch.to_vec()).await?;
                deleted += batch.len();
            }

            if !page.is_truncated().unwrap_or(false) {
                break;
            }
            key_marker = page.next_key_marker().map(str::to_string);
            version_marker = page.next_version_id_marker().map(str::to_string);
        }

        debug!("Deleted {deleted} object versions from {bucket}");
        Ok(deleted)
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                resource_error(SERVICE, "DeleteBucket", "S3 bucket", bucket, &["NoSuchBucket"], e)
            })?;
        Ok(())
    }
}
