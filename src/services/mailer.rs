use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::export::format_amount;
use crate::models::order::Order;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<()>;
}

/// Sends in a detached task so request latency never depends on SMTP.
pub fn send_in_background(mailer: Arc<dyn Mailer>, email: Email) {
    tokio::spawn(async move {
        let to = email.to.clone();
        match mailer.send(email).await {
            Ok(()) => tracing::debug!(to = %to, "email sent"),
            Err(e) => tracing::warn!(to = %to, error = %e, "email delivery failed"),
        }
    });
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .with_context(|| format!("invalid SMTP host {}", config.host))?
            .port(config.port);
        if !config.username.is_empty() {
            // app passwords are often pasted with spaces
            let password: String = config.password.chars().filter(|c| !c.is_whitespace()).collect();
            builder = builder.credentials(Credentials::new(config.username.clone(), password));
        }
        Ok(Self {
            transport: builder.build(),
            from: config.from.parse().context("invalid SMTP_FROM")?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse().with_context(|| format!("invalid recipient {}", email.to))?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Development mailer: writes the message to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "email (not sent, SMTP disabled)");
        Ok(())
    }
}

pub fn order_confirmation(order: &Order, to: &str) -> Email {
    let mut body = format!(
        "Hi {},\n\nThanks for your order {}.\n\nSubtotal: {}\n",
        order.customer_name,
        order.order_number,
        format_amount(order.subtotal)
    );
    if order.discount > 0 {
        body.push_str(&format!("Discount: -{}\n", format_amount(order.discount)));
    }
    body.push_str(&format!(
        "Delivery: {}\nTotal: {}\n\nWe will let you know when it is on its way.\n",
        format_amount(order.delivery_fee),
        format_amount(order.total)
    ));
    Email {
        to: to.to_string(),
        subject: format!("Order {} received", order.order_number),
        body,
    }
}

pub fn newsletter_welcome(to: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Welcome to the FoodHub newsletter".into(),
        body: "You are subscribed. Expect new dishes and offers in your inbox.\n".into(),
    }
}

pub fn contact_acknowledgement(to: &str, name: &str, subject: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("We received your message: {subject}"),
        body: format!("Hi {name},\n\nThanks for reaching out. Our team will reply shortly.\n"),
    }
}
