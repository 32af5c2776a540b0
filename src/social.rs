use async_trait::async_trait;
use tracing::info;

/// Social auto-post collaborator, fired after a successful listing create.
/// Entirely decoupled from the create's transaction outcome.
#[async_trait]
pub trait SocialPoster: Send + Sync {
    async fn post_listing(&self, caption: &str, image_url: &str) -> anyhow::Result<()>;
}

/// Structured-log sink standing in for the social media integrations.
pub struct LogPoster;

#[async_trait]
impl SocialPoster for LogPoster {
    async fn post_listing(&self, caption: &str, image_url: &str) -> anyhow::Result<()> {
        info!(%caption, %image_url, "listing auto-post");
        Ok(())
    }
}
