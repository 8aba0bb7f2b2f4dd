use async_trait::async_trait;
use tracing::warn;

/// Out-of-band user notification seam.
///
/// The delivery transport (mail, chat, whatever the host wires up) is an
/// external collaborator; the pipeline only needs somewhere to report that a
/// portal credential died mid-batch.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_token_expired(&self, user_id: &str);
}

/// Default implementation: a structured warning event the host's log shipper
/// turns into an alert.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_token_expired(&self, user_id: &str) {
        warn!(
            user_id,
            "portal token expired or unauthorized; submission batch halted"
        );
    }
}
