//! Value Object 定義
//!
//! Identifiers, room keys, coordinates and message content. All of them
//! validate on construction so the rest of the domain never sees a blank id.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Maximum length accepted for any identifier.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum length of a chat message text.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: String) -> Result<Self, ValidationError> {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::Empty($field));
                }
                if trimmed.len() > MAX_ID_LENGTH {
                    return Err(ValidationError::TooLong {
                        field: $field,
                        max: MAX_ID_LENGTH,
                    });
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ValidationError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

macro_rules! generated_id {
    ($name:ident) => {
        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }
    };
}

string_id!(
    /// Marketplace user (client, worker or admin)
    UserId,
    "user_id"
);
string_id!(BookingId, "booking_id");
string_id!(MessageId, "message_id");
string_id!(NotificationId, "notification_id");
string_id!(
    /// Live tracking session identifier. Unguessable by construction.
    SessionId,
    "session_id"
);
string_id!(
    /// One open WebSocket connection
    ConnectionId,
    "connection_id"
);
string_id!(
    /// Sender-generated idempotency key echoed back on the persisted message
    ClientKey,
    "client_key"
);

generated_id!(BookingId);
generated_id!(MessageId);
generated_id!(NotificationId);
generated_id!(SessionId);
generated_id!(ConnectionId);
generated_id!(ClientKey);

/// Unix timestamp in milliseconds (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Logical broadcast group.
///
/// Rooms are never stored; a room is only the set of connections currently
/// subscribed under its key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    Chat(BookingId),
    Live(SessionId),
    Notifications(UserId),
}

impl RoomKey {
    pub fn chat(booking_id: &BookingId) -> Self {
        Self::Chat(booking_id.clone())
    }

    pub fn live(session_id: &SessionId) -> Self {
        Self::Live(session_id.clone())
    }

    pub fn notifications(user_id: &UserId) -> Self {
        Self::Notifications(user_id.clone())
    }

    fn prefix(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::Live(_) => "live",
            Self::Notifications(_) => "notifications",
        }
    }

    fn id(&self) -> &str {
        match self {
            Self::Chat(id) => id.as_str(),
            Self::Live(id) => id.as_str(),
            Self::Notifications(id) => id.as_str(),
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix(), self.id())
    }
}

impl FromStr for RoomKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidRoomKey(s.to_string());
        let (prefix, id) = s.split_once(':').ok_or_else(invalid)?;
        let id = id.to_string();
        match prefix {
            "chat" => Ok(Self::Chat(BookingId::new(id).map_err(|_| invalid())?)),
            "live" => Ok(Self::Live(SessionId::new(id).map_err(|_| invalid())?)),
            "notifications" => Ok(Self::Notifications(
                UserId::new(id).map_err(|_| invalid())?,
            )),
            _ => Err(invalid()),
        }
    }
}

/// A position on the map. Plausibility is deliberately not checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Kind of an uploaded chat attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    File,
}

/// Reference to a file held by the external object store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub file_type: Option<FileType>,
}

impl Attachment {
    pub fn new(url: String, file_type: Option<FileType>) -> Result<Self, ValidationError> {
        let url = url.trim().to_string();
        if url.is_empty() {
            return Err(ValidationError::Empty("file_url"));
        }
        Ok(Self { url, file_type })
    }
}

/// Body of a chat message: text, a file, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent {
    text: String,
    attachment: Option<Attachment>,
}

impl MessageContent {
    /// Build message content, trimming the text.
    ///
    /// At least one of a non-blank text or an attachment is required.
    pub fn new(text: Option<String>, attachment: Option<Attachment>) -> Result<Self, ValidationError> {
        let text = text.map(|t| t.trim().to_string()).unwrap_or_default();
        if text.is_empty() && attachment.is_none() {
            return Err(ValidationError::MissingContent);
        }
        if text.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ValidationError::TooLong {
                field: "message",
                max: MAX_MESSAGE_LENGTH,
            });
        }
        Ok(Self { text, attachment })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn into_parts(self) -> (String, Option<Attachment>) {
        (self.text, self.attachment)
    }
}
