use async_trait::async_trait;
use lettre::message::{Mailbox, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters, TlsVersion};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use std::time::Duration;

use crate::config::{SmtpConfig, SmtpSecurity};

/// A fully composed message, ready to hand to a transport.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: Mailbox,
    pub to: Mailbox,
    pub subject: String,
    pub html: String,
}

/// Failure of a single delivery attempt. The display text is what callers
/// see in the `error` field, so it carries only the underlying detail.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Failed to build email message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("{0}")]
    Transport(String),
}

impl From<lettre::transport::smtp::Error> for DeliveryError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Delivers one message and returns its delivery identifier.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, email: OutgoingEmail) -> Result<String, DeliveryError>;
}

/// SMTP relay client. The underlying transport is built once and shared by
/// every request.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, lettre::transport::smtp::Error> {
        let tls = match cfg.security {
            SmtpSecurity::None => Tls::None,
            security => {
                let params = TlsParameters::builder(cfg.host.clone())
                    .dangerous_accept_invalid_certs(cfg.accept_invalid_certs)
                    .set_min_tls_version(TlsVersion::Tlsv12)
                    .build()?;
                if security == SmtpSecurity::Tls {
                    Tls::Wrapper(params)
                } else {
                    Tls::Required(params)
                }
            }
        };

        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host)
            .port(cfg.port)
            .tls(tls)
            .credentials(creds)
            .timeout(Some(cfg.timeout))
            .build();

        Ok(Self {
            transport,
            timeout: cfg.timeout,
        })
    }
}

/// Builds the lettre message with a fresh `Message-ID` and returns both.
/// The id uses the sender's domain, like most mail user agents do.
pub fn build_message(email: OutgoingEmail) -> Result<(Message, String), DeliveryError> {
    let message_id = format!("<{}@{}>", uuid::Uuid::new_v4(), email.from.email.domain());

    let message = Message::builder()
        .message_id(Some(message_id.clone()))
        .from(email.from)
        .to(email.to)
        .subject(email.subject)
        .singlepart(SinglePart::html(email.html))?;

    Ok((message, message_id))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<String, DeliveryError> {
        let (message, message_id) = build_message(email)?;

        // A relay that accepts the connection but never greets would otherwise
        // hold the request open indefinitely
        tokio::time::timeout(self.timeout, self.transport.send(message))
            .await
            .map_err(|_| {
                DeliveryError::Transport(format!(
                    "connection timed out after {}",
                    humantime_serde::re::humantime::format_duration(self.timeout)
                ))
            })??;

        Ok(message_id)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            from: "relay@example.com".parse().unwrap(),
            to: "inbox@example.org".parse().unwrap(),
            subject: "New Form Submission - Alice".to_string(),
            html: "<h2>hi</h2>".to_string(),
        }
    }

    #[test]
    fn message_id_uses_sender_domain() {
        let (message, id) = build_message(email()).unwrap();

        assert!(id.starts_with('<'));
        assert!(id.ends_with("@example.com>"));

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains(&id));
        assert!(raw.contains("inbox@example.org"));
        assert!(raw.contains("Content-Type: text/html"));
    }

    #[test]
    fn message_ids_are_unique() {
        let (_, a) = build_message(email()).unwrap();
        let (_, b) = build_message(email()).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn transport_error_displays_detail_only() {
        let err = DeliveryError::Transport("connection timed out".to_string());

        assert_eq!(err.to_string(), "connection timed out");
    }

    fn smtp_config(
        host: &str,
        port: u16,
        security: SmtpSecurity,
        timeout: Duration,
    ) -> SmtpConfig {
        SmtpConfig {
            host: host.to_string(),
            port,
            security,
            username: "user".to_string(),
            password: "pass".to_string(),
            accept_invalid_certs: true,
            timeout,
        }
    }

    #[tokio::test]
    async fn smtp_mailer_builds_for_every_security_mode() {
        for security in [SmtpSecurity::Starttls, SmtpSecurity::Tls, SmtpSecurity::None] {
            let cfg = smtp_config("localhost", 2525, security, Duration::from_secs(1));

            assert!(SmtpMailer::new(&cfg).is_ok(), "{security:?} failed to build");
        }
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let cfg = smtp_config("127.0.0.1", 1, SmtpSecurity::None, Duration::from_secs(2));
        let mailer = SmtpMailer::new(&cfg).unwrap();

        let err = mailer.send(email()).await.unwrap_err();

        match err {
            DeliveryError::Transport(detail) => assert!(!detail.is_empty()),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn silent_relay_times_out_as_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Accept and hold the connection without ever sending a greeting
        let relay = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let cfg = smtp_config(
            "127.0.0.1",
            port,
            SmtpSecurity::None,
            Duration::from_millis(100),
        );
        let mailer = SmtpMailer::new(&cfg).unwrap();

        let err = mailer.send(email()).await.unwrap_err();

        match err {
            DeliveryError::Transport(detail) => assert!(!detail.is_empty()),
            other => panic!("expected transport error, got {other:?}"),
        }

        relay.abort();
    }
}
