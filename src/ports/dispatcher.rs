//! Dispatcher port: Trait for delivering a rendered report.
//!
//! This trait abstracts the mail transport (lettre) from the application logic.

/// Errors reported by a dispatcher. Surfaced to the user verbatim.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid destination address: {0}")]
    InvalidAddress(String),

    #[error("Mail delivery is not configured: {0}")]
    NotConfigured(String),

    #[error("Mail delivery is not available in this build")]
    Unavailable,

    #[error("Message could not be built: {0}")]
    Message(String),

    #[error("Mail relay rejected the message: {0}")]
    Transport(String),
}

/// A file attached to an outbound message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Fully composed message handed to a dispatcher.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Destination address
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

/// Trait for report delivery.
///
/// Implementations must not retry silently and must only return `Ok` when
/// the transport accepted the message.
pub trait ReportDispatcher: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    /// Returns the transport's failure as a `DispatchError`.
    fn send(&self, message: &OutboundMessage) -> Result<(), DispatchError>;

    /// Whether a sender and credential are available.
    fn is_configured(&self) -> bool;
}
