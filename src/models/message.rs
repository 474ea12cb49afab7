use std::fmt;

use serde_json::{Map, Value};

/// Recipient prefix that addresses a group instead of a single participant.
pub const GROUP_PREFIX: &str = "@";

/// Recipient prefix reserved for private messages. `GROUP_PREFIX` is checked
/// first and is a prefix of this one, so recipients starting with it always
/// resolve to a group.
pub const PRIVATE_PREFIX: &str = "@@";

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Decoded inbound chat frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub content: String,
    pub recipient: String,
}

impl Envelope {
    /// Decode a text frame. `content` and `recipient` fall back to an empty
    /// string when missing or not a JSON string.
    pub fn decode(frame: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(frame)?;
        let Value::Object(object) = value else {
            return Err(EnvelopeError::NotAnObject(json_kind(&value)));
        };

        Ok(Self {
            content: string_member(&object, "content"),
            recipient: string_member(&object, "recipient"),
        })
    }

    pub fn destination(&self) -> Destination<'_> {
        if self.recipient.is_empty() {
            Destination::Broadcast
        } else if let Some(group) = self.recipient.strip_prefix(GROUP_PREFIX) {
            Destination::Group(group)
        } else {
            Destination::Private(&self.recipient)
        }
    }
}

fn string_member(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination<'a> {
    Broadcast,
    Group(&'a str),
    Private(&'a str),
}

/// Plain-text frames the relay sends to participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound<'a> {
    Joined { username: &'a str },
    Left { username: &'a str },
    LeftOnError { username: &'a str, cause: &'a str },
    Broadcast { sender: &'a str, content: &'a str },
    Group { sender: &'a str, group: &'a str, content: &'a str },
    Private { sender: &'a str, content: &'a str },
}

impl fmt::Display for Outbound<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outbound::Joined { username } => write!(f, "User {username} joined"),
            Outbound::Left { username } => write!(f, "User {username} left"),
            Outbound::LeftOnError { username, cause } => {
                write!(f, "User {username} left on error: {cause}")
            }
            Outbound::Broadcast { sender, content } => write!(f, "{sender}: {content}"),
            Outbound::Group {
                sender,
                group,
                content,
            } => write!(f, "{sender} (group {group}): {content}"),
            Outbound::Private { sender, content } => write!(f, "{sender} (private): {content}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_content_and_recipient() {
        let envelope = Envelope::decode(r#"{"content":"hi","recipient":"bob"}"#).unwrap();
        assert_eq!(envelope.content, "hi");
        assert_eq!(envelope.recipient, "bob");
    }

    #[test]
    fn missing_and_non_string_members_default_to_empty() {
        let envelope = Envelope::decode(r#"{"content":42,"extra":true}"#).unwrap();
        assert_eq!(envelope, Envelope::default());

        let envelope = Envelope::decode(r#"{"recipient":null}"#).unwrap();
        assert_eq!(envelope.recipient, "");
    }

    #[test]
    fn rejects_malformed_and_non_object_frames() {
        assert!(matches!(
            Envelope::decode("not-json"),
            Err(EnvelopeError::InvalidJson(_))
        ));
        assert!(matches!(
            Envelope::decode(r#"["content"]"#),
            Err(EnvelopeError::NotAnObject("array"))
        ));
    }

    #[test]
    fn classifies_destinations() {
        let envelope = |recipient: &str| Envelope {
            content: String::new(),
            recipient: recipient.to_string(),
        };

        assert_eq!(envelope("").destination(), Destination::Broadcast);
        assert_eq!(envelope("@eng").destination(), Destination::Group("eng"));
        assert_eq!(envelope("@").destination(), Destination::Group(""));
        assert_eq!(envelope("bob").destination(), Destination::Private("bob"));
    }

    #[test]
    fn private_prefix_resolves_as_group() {
        let recipient = format!("{PRIVATE_PREFIX}bob");
        let envelope = Envelope {
            content: String::new(),
            recipient,
        };
        assert_eq!(envelope.destination(), Destination::Group("@bob"));
    }

    #[test]
    fn formats_outbound_frames() {
        assert_eq!(Outbound::Joined { username: "a" }.to_string(), "User a joined");
        assert_eq!(Outbound::Left { username: "a" }.to_string(), "User a left");
        assert_eq!(
            Outbound::LeftOnError {
                username: "a",
                cause: "reset"
            }
            .to_string(),
            "User a left on error: reset"
        );
        assert_eq!(
            Outbound::Broadcast {
                sender: "a",
                content: ""
            }
            .to_string(),
            "a: "
        );
        assert_eq!(
            Outbound::Group {
                sender: "a",
                group: "eng",
                content: "x"
            }
            .to_string(),
            "a (group eng): x"
        );
        assert_eq!(
            Outbound::Private {
                sender: "a",
                content: "x"
            }
            .to_string(),
            "a (private): x"
        );
    }
}
