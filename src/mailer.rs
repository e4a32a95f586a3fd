//! Outbound reservation notifications.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::MailTransportConfig;
use crate::model::ReservationInfo;

pub const RESERVATION_SUBJECT: &str = "New reservation";
const DELIVERY_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid address {address}: {reason}")]
    Address { address: String, reason: String },
    #[error("could not build message: {0}")]
    Build(String),
    #[error("transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError>;
}

/// Writes the notification to the log instead of sending it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        info!(to, subject, bytes = html_body.len(), "notification (log transport)");
        Ok(())
    }
}

enum MailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

pub struct MailNotifier {
    transport: MailTransport,
    from: Mailbox,
}

impl MailNotifier {
    pub fn new(transport: &MailTransportConfig, from: &str) -> Result<Self, NotifyError> {
        let from = parse_mailbox(from)?;
        let transport = match transport {
            MailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    warn!("SMTP TLS is disabled");
                }
                let builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                        .map_err(|e| NotifyError::Transport(e.to_string()))?
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                };
                let mut builder = builder.port(*port);
                if let (Some(user), Some(pass)) = (username, password) {
                    builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
                }
                MailTransport::Smtp(builder.build())
            }
            MailTransportConfig::File { dir } => {
                std::fs::create_dir_all(dir)
                    .map_err(|e| NotifyError::Transport(format!("create {}: {e}", dir.display())))?;
                MailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(dir))
            }
            MailTransportConfig::Log => {
                return Err(NotifyError::Transport(
                    "log transport has no mail backend".into(),
                ));
            }
        };
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        match &self.transport {
            MailTransport::Smtp(smtp) => {
                smtp.send(message)
                    .await
                    .map_err(|e| NotifyError::Transport(e.to_string()))?;
            }
            MailTransport::File(file) => {
                file.send(message)
                    .await
                    .map_err(|e| NotifyError::Transport(e.to_string()))?;
            }
        }
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse::<Mailbox>().map_err(|e| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Pick the notifier for the configured transport.
pub fn build_notifier(
    transport: &MailTransportConfig,
    from: &str,
) -> Result<Arc<dyn Notifier>, NotifyError> {
    match transport {
        MailTransportConfig::Log => Ok(Arc::new(LogNotifier)),
        other => Ok(Arc::new(MailNotifier::new(other, from)?)),
    }
}

/// Send with bounded retries. Returns the last error after the final attempt.
pub async fn deliver_with_retry(
    notifier: &dyn Notifier,
    to: &str,
    subject: &str,
    html_body: &str,
) -> Result<(), NotifyError> {
    let mut attempt = 0;
    loop {
        match notifier.send(to, subject, html_body).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt + 1 < DELIVERY_ATTEMPTS => {
                let delay = BACKOFF_BASE * 2u32.pow(attempt);
                warn!(attempt = attempt + 1, ?delay, error = %e, "notification failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn reservation_email_body(r: &ReservationInfo) -> String {
    let message = r.message.as_deref().map(escape_html).unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{RESERVATION_SUBJECT}</title>
</head>
<body>
    <h2>{RESERVATION_SUBJECT}</h2>
    <table>
        <tr><td>Date</td><td>{date}</td></tr>
        <tr><td>Time</td><td>{time}</td></tr>
        <tr><td>Name</td><td>{name}</td></tr>
        <tr><td>Surname</td><td>{surname}</td></tr>
        <tr><td>Phone</td><td>{phone}</td></tr>
        <tr><td>Guests</td><td>{party}</td></tr>
        <tr><td>Game</td><td>{game}</td></tr>
        <tr><td>Eat &amp; play</td><td>{eat_and_play}</td></tr>
        <tr><td>Message</td><td>{message}</td></tr>
    </table>
</body>
</html>"#,
        date = r.date.format("%d.%m.%Y"),
        time = r.time.format("%H:%M"),
        name = escape_html(&r.name),
        surname = escape_html(&r.surname),
        phone = escape_html(&r.phone),
        party = r.party_size,
        game = if r.game { "yes" } else { "no" },
        eat_and_play = if r.eat_and_play { "yes" } else { "no" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use ulid::Ulid;

    struct Flaky {
        failures_left: AtomicU32,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for Flaky {
        async fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<(), NotifyError> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(NotifyError::Transport("connection refused".into()));
            }
            self.sent.lock().unwrap().push(to.to_string());
            Ok(())
        }
    }

    fn flaky(failures: u32) -> Flaky {
        Flaky {
            failures_left: AtomicU32::new(failures),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn info() -> ReservationInfo {
        ReservationInfo {
            id: Ulid::new(),
            date: NaiveDate::from_ymd_opt(2024, 7, 27).unwrap(),
            time: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            party_size: 4,
            game: true,
            eat_and_play: false,
            name: "Anna".into(),
            surname: "<Schmidt>".into(),
            phone: "+491701234567".into(),
            message: Some("Birthday & cake".into()),
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let n = flaky(2);
        deliver_with_retry(&n, "staff@example.com", RESERVATION_SUBJECT, "<p/>")
            .await
            .unwrap();
        assert_eq!(n.sent.lock().unwrap().as_slice(), ["staff@example.com"]);
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts() {
        let n = flaky(3);
        let err = deliver_with_retry(&n, "staff@example.com", RESERVATION_SUBJECT, "<p/>")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
        assert!(n.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn body_lists_fields_and_escapes_markup() {
        let body = reservation_email_body(&info());
        assert!(body.contains("27.07.2024"));
        assert!(body.contains("18:30"));
        assert!(body.contains("+491701234567"));
        assert!(body.contains("&lt;Schmidt&gt;"));
        assert!(body.contains("Birthday &amp; cake"));
        assert!(!body.contains("<Schmidt>"));
    }

    #[tokio::test]
    async fn file_transport_writes_message() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = MailNotifier::new(
            &MailTransportConfig::File {
                dir: dir.path().to_path_buf(),
            },
            "Tablebook <reservations@localhost>",
        )
        .unwrap();
        notifier
            .send("staff@example.com", RESERVATION_SUBJECT, "<p>hi</p>")
            .await
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn bad_sender_address_is_rejected() {
        let err = MailNotifier::new(&MailTransportConfig::Log, "not an address")
            .err()
            .unwrap();
        assert!(matches!(err, NotifyError::Address { .. }));
    }
}
