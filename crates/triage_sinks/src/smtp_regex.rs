//! Sends an email when an object's rendered content matches a configured
//! regex. Named "SMTP-on-regex" alongside the other built-in sinks; the
//! synchronous `lettre::SmtpTransport` is used in place of the async
//! transport because every worker here runs its own blocking main loop.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use regex::Regex;

use triage_protocol::{Kind, Object};
use triage_worker::Sink;

pub struct SmtpOnRegexSink {
    pattern: Regex,
    from: Mailbox,
    to: Mailbox,
    subject: String,
    transport: SmtpTransport,
}

impl SmtpOnRegexSink {
    pub fn new(
        pattern: &str,
        host: &str,
        from: &str,
        to: &str,
        subject: impl Into<String>,
        credentials: Option<(String, String)>,
    ) -> anyhow::Result<Self> {
        let builder = if let Some((user, pass)) = credentials {
            SmtpTransport::starttls_relay(host)?.credentials(Credentials::new(user, pass))
        } else {
            SmtpTransport::builder_dangerous(host)
        };
        Ok(SmtpOnRegexSink {
            pattern: Regex::new(pattern)?,
            from: from.parse()?,
            to: to.parse()?,
            subject: subject.into(),
            transport: builder.build(),
        })
    }
}

impl Sink for SmtpOnRegexSink {
    fn accepts(&self, kind: Kind) -> bool {
        matches!(kind, Kind::LogEntry | Kind::DeathLog)
    }

    fn handle(&mut self, input: &Object) {
        let rendered = input.to_string();
        if !self.pattern.is_match(&rendered) {
            return;
        }
        let email = match Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(&self.subject)
            .body(rendered)
        {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(target: "triage_sinks", error = %e, "smtp message build failed");
                return;
            }
        };
        match self.transport.send(&email) {
            Ok(_) => tracing::debug!(target: "triage_sinks", "smtp alert sent"),
            Err(e) => tracing::error!(target: "triage_sinks", error = %e, "smtp send failed"),
        }
    }
}
