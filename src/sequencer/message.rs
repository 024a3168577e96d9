//! Typed views over log entries.
//!
//! The generic codec treats every payload as opaque. Consumers that care
//! about a variant call [`LogEntry::message`] to parse the payload according
//! to the entry's `message_type`.

use super::error::{SequencerError, SequencerResult};
use super::types::{DOMAIN_MESSAGE_TYPE, HEARTBEAT_MESSAGE_TYPE, LogEntry};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A log entry payload interpreted according to its message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Domain traffic owned by a session or component (`owner_tag|body`).
    Domain {
        /// Identifies who the body belongs to, e.g. a session id.
        owner_tag: String,
        /// The domain body, which may contain further delimiters.
        body: String,
    },

    /// Engine heartbeat carrying the wall-clock milliseconds at creation.
    Heartbeat {
        /// Milliseconds since the Unix epoch.
        millis: i64,
    },

    /// Any other message type, left uninterpreted.
    Custom {
        /// The entry's message type.
        message_type: String,
        /// The raw payload.
        payload: String,
    },
}

impl Message {
    /// Message type string this variant is stored under.
    #[must_use]
    pub fn message_type(&self) -> &str {
        match self {
            Message::Domain { .. } => DOMAIN_MESSAGE_TYPE,
            Message::Heartbeat { .. } => HEARTBEAT_MESSAGE_TYPE,
            Message::Custom { message_type, .. } => message_type,
        }
    }

    /// Build the unsequenced entry carrying this message.
    #[must_use]
    pub fn into_entry(self) -> LogEntry {
        match self {
            Message::Domain { owner_tag, body } => LogEntry::domain(owner_tag, body),
            Message::Heartbeat { millis } => {
                LogEntry::new(HEARTBEAT_MESSAGE_TYPE, millis.to_string())
            }
            Message::Custom {
                message_type,
                payload,
            } => LogEntry::new(message_type, payload),
        }
    }
}

impl LogEntry {
    /// Create an unsequenced domain entry with payload `owner_tag|body`.
    pub fn domain(owner_tag: impl AsRef<str>, body: impl AsRef<str>) -> Self {
        LogEntry::new(
            DOMAIN_MESSAGE_TYPE,
            format!("{}|{}", owner_tag.as_ref(), body.as_ref()),
        )
    }

    /// Create an unsequenced heartbeat stamped with the current time.
    #[must_use]
    pub fn heartbeat() -> Self {
        LogEntry::new(HEARTBEAT_MESSAGE_TYPE, Utc::now().timestamp_millis().to_string())
    }

    /// Parse the payload according to the message type.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::MalformedEntry`] when a domain payload has
    /// no `owner_tag|body` split or a heartbeat payload is not an integer.
    pub fn message(&self) -> SequencerResult<Message> {
        match self.message_type() {
            DOMAIN_MESSAGE_TYPE => {
                let Some((owner_tag, body)) = self.payload().split_once('|') else {
                    return Err(SequencerError::malformed(
                        self.payload(),
                        "domain payload must be owner_tag|body",
                    ));
                };
                Ok(Message::Domain {
                    owner_tag: owner_tag.to_string(),
                    body: body.to_string(),
                })
            }
            HEARTBEAT_MESSAGE_TYPE => {
                let millis = self.payload().parse::<i64>().map_err(|e| {
                    SequencerError::malformed(self.payload(), format!("heartbeat payload: {e}"))
                })?;
                Ok(Message::Heartbeat { millis })
            }
            other => Ok(Message::Custom {
                message_type: other.to_string(),
                payload: self.payload().to_string(),
            }),
        }
    }
}
