use async_trait::async_trait;

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail transport. Delivery is best effort: callers log and drop
/// failures.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

/// Transport that only writes the message to the log, tagged with the relay
/// it is configured for.
pub struct LogMailer {
    relay: String,
    from: String,
}

impl LogMailer {
    pub fn new(config: &MailConfig) -> Self {
        let from = match config.username.as_deref() {
            Some(addr) if !addr.is_empty() => format!("{} <{addr}>", config.from_name),
            _ => config.from_name.clone(),
        };
        Self {
            relay: format!("{}:{}", config.server, config.port),
            from,
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        tracing::info!(
            relay = %self.relay,
            from = %self.from,
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.body,
            "mail sent"
        );
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config(username: Option<&str>) -> MailConfig {
        MailConfig {
            server: "smtp.example.com".into(),
            port: 2525,
            username: username.map(Into::into),
            password: Some("secret".into()),
            from_name: "Quizforge Support".into(),
        }
    }

    #[tokio::test]
    async fn log_mailer_uses_configured_relay_and_sender() {
        let mailer = LogMailer::new(&mail_config(Some("bot@example.com")));
        assert_eq!(mailer.relay, "smtp.example.com:2525");
        assert_eq!(mailer.from, "Quizforge Support <bot@example.com>");
        mailer
            .send(OutgoingMail {
                to: "ana@example.com".into(),
                subject: "hi".into(),
                body: "hello".into(),
            })
            .await
            .expect("log transport never fails");
    }

    #[test]
    fn sender_without_address_is_just_the_name() {
        let mailer = LogMailer::new(&mail_config(None));
        assert_eq!(mailer.from, "Quizforge Support");
    }
}
