//! Mail adapter: Implementation of ReportDispatcher over implicit-TLS SMTP.
//!
//! The relay is reached on the submission port with TLS from the first byte
//! (`SmtpTransport::relay`, port 465). The sender password is only ever held
//! in `Zeroizing` memory and is redacted from `Debug` output.

use zeroize::Zeroizing;

use crate::ports::{DispatchError, OutboundMessage, ReportDispatcher};

/// Default relay host.
pub const DEFAULT_RELAY: &str = "smtp.gmail.com";

/// Connection and credentials for the outbound relay.
#[derive(Clone)]
pub struct SmtpSettings {
    pub relay: String,
    pub sender: Option<String>,
    pub password: Option<Zeroizing<String>>,
}

impl SmtpSettings {
    /// Whether a sender and credential are both present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sender.is_some() && self.password.is_some()
    }
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            relay: DEFAULT_RELAY.to_string(),
            sender: None,
            password: None,
        }
    }
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("relay", &self.relay)
            .field("sender", &self.sender.as_ref().map(|_| "[set]"))
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Check the shape of an e-mail address: `local@domain.tld`, no whitespace.
///
/// # Errors
/// Returns `DispatchError::InvalidAddress` describing the first problem found.
pub fn validate_address(address: &str) -> Result<(), DispatchError> {
    let invalid = |why: &str| Err(DispatchError::InvalidAddress(why.to_string()));

    if address.is_empty() {
        return invalid("address is empty");
    }
    if address.len() > 254 {
        return invalid("address is longer than 254 characters");
    }
    if address.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return invalid("address contains whitespace");
    }
    let Some((local, domain)) = address.rsplit_once('@') else {
        return invalid("address has no '@'");
    };
    if local.is_empty() || local.len() > 64 || local.contains('@') {
        return invalid("local part is empty, too long or contains '@'");
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2
        || labels.iter().any(|l| {
            l.is_empty()
                || l.starts_with('-')
                || l.ends_with('-')
                || !l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
    {
        return invalid("domain must look like example.org");
    }
    Ok(())
}

/// Dispatcher used when mail support is compiled out.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledDispatcher;

impl ReportDispatcher for DisabledDispatcher {
    fn send(&self, _message: &OutboundMessage) -> Result<(), DispatchError> {
        Err(DispatchError::Unavailable)
    }

    fn is_configured(&self) -> bool {
        false
    }
}

#[cfg(feature = "smtp")]
pub use transport::SmtpDispatcher;

#[cfg(feature = "smtp")]
mod transport {
    use std::time::Duration;

    use lettre::message::header::ContentType;
    use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{Message, SmtpTransport, Transport};

    use super::SmtpSettings;
    use crate::ports::{DispatchError, OutboundMessage, ReportDispatcher};

    const SEND_TIMEOUT: Duration = Duration::from_secs(30);

    /// `lettre` SMTP dispatcher. One connection per message; no retries.
    pub struct SmtpDispatcher {
        settings: SmtpSettings,
    }

    impl SmtpDispatcher {
        #[must_use]
        pub fn new(settings: SmtpSettings) -> Self {
            Self { settings }
        }

        fn build_message(
            &self,
            sender: &str,
            message: &OutboundMessage,
        ) -> Result<Message, DispatchError> {
            let from = sender
                .parse::<Mailbox>()
                .map_err(|e| DispatchError::NotConfigured(format!("sender address: {e}")))?;
            let to = message
                .to
                .parse::<Mailbox>()
                .map_err(|e| DispatchError::InvalidAddress(e.to_string()))?;

            let builder = Message::builder()
                .from(from)
                .to(to)
                .subject(message.subject.clone());

            let built = match &message.attachment {
                Some(attachment) => {
                    let content_type = ContentType::parse(&attachment.content_type)
                        .map_err(|e| DispatchError::Message(e.to_string()))?;
                    builder.multipart(
                        MultiPart::mixed()
                            .singlepart(SinglePart::plain(message.body.clone()))
                            .singlepart(
                                Attachment::new(attachment.filename.clone())
                                    .body(attachment.bytes.clone(), content_type),
                            ),
                    )
                }
                None => builder.body(message.body.clone()),
            };
            built.map_err(|e| DispatchError::Message(e.to_string()))
        }
    }

    impl ReportDispatcher for SmtpDispatcher {
        fn send(&self, message: &OutboundMessage) -> Result<(), DispatchError> {
            let (Some(sender), Some(password)) = (&self.settings.sender, &self.settings.password)
            else {
                return Err(DispatchError::NotConfigured(
                    "set HEARTWISE_SMTP_SENDER and an SMTP password source".into(),
                ));
            };

            let email = self.build_message(sender, message)?;

            let credentials = Credentials::new(sender.clone(), password.to_string());
            let mailer = SmtpTransport::relay(&self.settings.relay)
                .map_err(|e| DispatchError::Transport(e.to_string()))?
                .credentials(credentials)
                .timeout(Some(SEND_TIMEOUT))
                .build();

            mailer
                .send(&email)
                .map_err(|e| DispatchError::Transport(e.to_string()))?;

            tracing::info!("Report e-mail accepted by relay {}", self.settings.relay);
            Ok(())
        }

        fn is_configured(&self) -> bool {
            self.settings.is_complete()
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        assert!(validate_address("doctor@example.com").is_ok());
        assert!(validate_address("a.b+c@mail.example.co.uk").is_ok());

        for bad in ["", "doctor", "doctor@", "@example.com", "doc tor@example.com", "doctor@localhost", "doctor@-x.com", "doctor@example..com"] {
            assert!(
                matches!(validate_address(bad), Err(DispatchError::InvalidAddress(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let settings = SmtpSettings {
            password: Some(Zeroizing::new("super-secret-pass".into())),
            sender: Some("clinic@example.org".into()),
            ..SmtpSettings::default()
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("super-secret-pass"));
        assert!(!debug.contains("clinic@example.org"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_disabled_dispatcher() {
        let message = OutboundMessage {
            to: "doctor@example.com".into(),
            subject: String::new(),
            body: String::new(),
            attachment: None,
        };
        assert!(matches!(
            DisabledDispatcher.send(&message),
            Err(DispatchError::Unavailable)
        ));
    }
}
