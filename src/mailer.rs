use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

/// Message sent after registration carrying the activation token.
#[derive(Clone)]
pub struct WelcomeEmail {
    pub user_id: i64,
    pub name: String,
    pub activation_token: String,
    pub activation_ttl_hours: i64,
}

impl WelcomeEmail {
    pub fn subject(&self) -> &'static str {
        "Welcome to MyReference!"
    }

    pub fn body(&self) -> String {
        format!(
            "Hi {name},\n\n\
             Thanks for signing up for a MyReference account (id {id}).\n\n\
             Please send a PUT /v1/users/activated request with the following body \
             to activate your account:\n\n\
             {{\"token\": \"{token}\"}}\n\n\
             This is a one-time token and it will expire in {lifetime}.\n",
            name = self.name,
            id = self.user_id,
            token = self.activation_token,
            lifetime = describe_hours(self.activation_ttl_hours),
        )
    }
}

fn describe_hours(hours: i64) -> String {
    match hours {
        1 => "1 hour".into(),
        24 => "1 day".into(),
        h if h > 0 && h % 24 == 0 => format!("{} days", h / 24),
        h => format!("{h} hours"),
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, recipient: &str, email: &WelcomeEmail) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host)
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .timeout(Some(Duration::from_secs(5)))
            .build();
        Self {
            transport,
            sender: cfg.sender.clone(),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_welcome(&self, recipient: &str, email: &WelcomeEmail) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.sender.parse::<Mailbox>().context("parse sender address")?)
            .to(recipient.parse::<Mailbox>().context("parse recipient address")?)
            .subject(email.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body())
            .context("build welcome email")?;

        // Up to three attempts, 500ms apart.
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.send(message.clone()).await {
                Ok(_) => return Ok(()),
                Err(e) if attempt < 3 => {
                    tracing::warn!(error = %e, attempt, "smtp send failed, retrying");
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                Err(e) => return Err(e).context("smtp send"),
            }
        }
    }
}
