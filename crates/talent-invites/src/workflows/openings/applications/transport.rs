use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fully rendered e-mail handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Outbound e-mail adapter (SMTP relay, Brevo, SES, ...).
pub trait MailTransport: Send + Sync {
    fn send(&self, mail: &OutboundMail) -> Result<(), TransportError>;
}

/// Any transport error counts as a failed send; bounce and connection errors are not told apart.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("mail rejected: {0}")]
    Rejected(String),
    #[error("mail transport unavailable: {0}")]
    Unavailable(String),
}

/// Room key for live notifications: a candidate id or a recruiter id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelKey(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub message: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
}

/// Fire-and-forget sink for live UI updates.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, channel: &ChannelKey, event: NotificationEvent)
        -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Deliver to the sink and swallow failures after logging them.
pub(crate) fn notify_best_effort<N>(sink: &N, channel: ChannelKey, event: NotificationEvent)
where
    N: NotificationSink + ?Sized,
{
    if let Err(err) = sink.notify(&channel, event) {
        tracing::warn!(channel = %channel.0, error = %err, "live notification dropped");
    }
}
