//! Wire types exchanged with the Courier API

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CourierError, CourierResult};

/// Identifier of a mailbox account
pub type AccountId = i64;

/// Identifier of a single message
pub type MessageId = i64;

/// Identifier of a conversation thread
///
/// The API emits thread ids as strings; integers are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ThreadId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for ThreadId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ThreadId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => ThreadId(text),
            Raw::Number(number) => ThreadId(number.to_string()),
        })
    }
}

/// Timestamps arrive either RFC 3339 or naive (read as UTC)
mod lenient_datetime {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(text) => parse(&text).map(Some).map_err(serde::de::Error::custom),
        }
    }

    pub fn parse(text: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
            return Ok(aware.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp '{}': {}", text, e))
    }
}

fn required_datetime<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let text = String::deserialize(deserializer)?;
    lenient_datetime::parse(&text).map_err(serde::de::Error::custom)
}

/// Minimal profile of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Registration request body
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// User record returned by registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredUser {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Mailbox account as returned by the API
///
/// Credentials are never part of the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email_address: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub email_user: Option<String>,
    #[serde(default)]
    pub imap_server: Option<String>,
    #[serde(default)]
    pub imap_port: Option<u16>,
    #[serde(default)]
    pub smtp_server: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
}

/// Payload for creating a mailbox account
#[derive(Clone, Default, Serialize)]
pub struct NewAccount {
    pub email_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imap_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imap_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl NewAccount {
    pub fn new(email_address: impl Into<String>) -> Self {
        Self {
            email_address: email_address.into(),
            ..Default::default()
        }
    }

    /// Check the payload before sending it
    pub fn validate(&self) -> CourierResult<()> {
        if !email_address::EmailAddress::is_valid(&self.email_address) {
            return Err(CourierError::validation(format!(
                "Invalid email address: {}",
                self.email_address
            )));
        }

        for (name, secret) in [
            ("password", &self.password),
            ("access_token", &self.access_token),
            ("refresh_token", &self.refresh_token),
        ] {
            if matches!(secret, Some(value) if value.is_empty()) {
                return Err(CourierError::validation(format!("{} cannot be empty", name)));
            }
        }

        for (name, port) in [("imap_port", self.imap_port), ("smtp_port", self.smtp_port)] {
            if port == Some(0) {
                return Err(CourierError::validation(format!("{} cannot be zero", name)));
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |secret: &Option<String>| secret.as_ref().map(|_| "<redacted>");
        f.debug_struct("NewAccount")
            .field("email_address", &self.email_address)
            .field("email_user", &self.email_user)
            .field("imap_server", &self.imap_server)
            .field("imap_port", &self.imap_port)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("password", &redact(&self.password))
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

/// Conversation summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime::deserialize")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Attachment metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    #[serde(default)]
    pub filename: Option<String>,
    pub content_type: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub content_id: Option<String>,
}

/// A message within a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub message_id_header: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub sender_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime::deserialize")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime::deserialize")]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub thread_id: Option<ThreadId>,
    #[serde(default)]
    pub in_reply_to_header: Option<String>,
    #[serde(default)]
    pub recipients_to: Option<Vec<String>>,
    #[serde(default)]
    pub recipients_cc: Option<Vec<String>>,
}

/// Complaint or suggestion extracted from a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: i64,
    pub email_message_id: MessageId,
    pub submitter_email: String,
    #[serde(default)]
    pub submitter_name: Option<String>,
    pub issue_type: String,
    #[serde(default)]
    pub category_detail: Option<String>,
    #[serde(default)]
    pub product_service: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(deserialize_with = "required_datetime")]
    pub extracted_at: DateTime<Utc>,
    #[serde(default)]
    pub email_subject: Option<String>,
}

/// Outgoing email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeRequest {
    pub from_account_id: AccountId,
    pub to_recipients: Vec<String>,
    #[serde(default)]
    pub cc_recipients: Vec<String>,
    #[serde(default)]
    pub bcc_recipients: Vec<String>,
    pub subject: String,
    pub body_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
}

impl ComposeRequest {
    /// Check recipients and subject before sending
    pub fn validate(&self) -> CourierResult<()> {
        if self.to_recipients.is_empty() {
            return Err(CourierError::validation("At least one recipient is required"));
        }

        let all = self
            .to_recipients
            .iter()
            .chain(&self.cc_recipients)
            .chain(&self.bcc_recipients);
        for address in all {
            if !email_address::EmailAddress::is_valid(address) {
                return Err(CourierError::validation(format!("Invalid email address: {}", address)));
            }
        }

        if self.subject.trim().is_empty() {
            return Err(CourierError::validation("Subject cannot be empty"));
        }

        Ok(())
    }
}

/// Send endpoint response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendEmailResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply suggestion endpoint response
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SuggestionsResponse {
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
}
