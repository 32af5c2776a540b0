use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

/// Media collaborator: takes raw image bytes plus a path hint, returns a
/// stable public URL. The product core treats returned URLs as opaque strings.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload_image(&self, key: &str, body: Bytes, content_type: &str)
        -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct S3Media {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3Media {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        region: &str,
        public_base_url: &str,
    ) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ))
            .endpoint_url(endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: bucket.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MediaStore for S3Media {
    async fn upload_image(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}
