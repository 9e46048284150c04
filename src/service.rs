use crate::{
    config::Config,
    dto::SubmissionRequest,
    mailer::{DeliveryError, Mailer, OutgoingEmail},
};

use chrono::{DateTime, Local};
use lettre::{address::AddressError, message::Mailbox};

use std::sync::Arc;

const REMARK_PLACEHOLDER: &str = "None";

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("Missing required fields: name, email, phone")]
    MissingFields,

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub remark: Option<String>,
}

impl TryFrom<SubmissionRequest> for Submission {
    type Error = ContactError;

    fn try_from(request: SubmissionRequest) -> Result<Self, Self::Error> {
        fn present(field: Option<String>) -> Option<String> {
            field.filter(|v| !v.is_empty())
        }

        match (
            present(request.name),
            present(request.email),
            present(request.phone),
        ) {
            (Some(name), Some(email), Some(phone)) => Ok(Self {
                name,
                email,
                phone,
                remark: present(request.remark),
            }),
            _ => Err(ContactError::MissingFields),
        }
    }
}

pub struct ContactService {
    sender: Mailbox,
    recipient: Mailbox,
    mailer: Arc<dyn Mailer>,
}

impl ContactService {
    /// Fails when the configured sender or recipient is not a valid address.
    pub fn new(config: &Config, mailer: Arc<dyn Mailer>) -> Result<Self, AddressError> {
        Ok(Self {
            sender: config.sender.parse()?,
            recipient: config.recipient.parse()?,
            mailer,
        })
    }

    /// Validates the submission and relays it. Returns the delivery id.
    pub async fn submit(&self, request: SubmissionRequest) -> Result<String, ContactError> {
        let submission = Submission::try_from(request)?;
        let email = self.compose(&submission, Local::now());

        tracing::info!(
            "Relaying submission from '{}' to '{}'",
            submission.name,
            self.recipient
        );

        let message_id = self.mailer.send(email).await?;

        Ok(message_id)
    }

    pub fn compose(&self, submission: &Submission, sent_at: DateTime<Local>) -> OutgoingEmail {
        OutgoingEmail {
            from: self.sender.clone(),
            to: self.recipient.clone(),
            subject: format!("New Form Submission - {}", submission.name),
            html: render_body(submission, sent_at),
        }
    }
}

fn render_body(submission: &Submission, sent_at: DateTime<Local>) -> String {
    let remark = submission.remark.as_deref().unwrap_or(REMARK_PLACEHOLDER);

    format!(
        "<h2>New Form Submission Received</h2>\n\
         <p><strong>Name:</strong> {}</p>\n\
         <p><strong>Email:</strong> {}</p>\n\
         <p><strong>Phone:</strong> {}</p>\n\
         <p><strong>Remark:</strong> {}</p>\n\
         <hr>\n\
         <p><small>Sent at: {}</small></p>\n",
        escape_html(&submission.name),
        escape_html(&submission.email),
        escape_html(&submission.phone),
        escape_html(remark),
        format_timestamp(sent_at),
    )
}

/// US-style local time, e.g. `10/16/2026, 3:04:05 PM`.
fn format_timestamp(at: DateTime<Local>) -> String {
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for c in input.chars() {
        match c {
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }

    output
}
