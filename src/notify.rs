use async_trait::async_trait;
use tracing::info;

/// Notification collaborator. Always invoked from a detached task; errors are
/// logged by the caller and never surface to the request that triggered them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_product_rejected(
        &self,
        owner_contact: &str,
        owner_display_name: &str,
        product_name: &str,
        reason: &str,
    ) -> anyhow::Result<()>;
}

/// Structured-log sink standing in for the mail provider; delivery mechanics
/// live outside this service.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_product_rejected(
        &self,
        owner_contact: &str,
        owner_display_name: &str,
        product_name: &str,
        reason: &str,
    ) -> anyhow::Result<()> {
        info!(
            to = %owner_contact,
            owner = %owner_display_name,
            product = %product_name,
            %reason,
            "product rejection notification"
        );
        Ok(())
    }
}
