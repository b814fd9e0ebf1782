//! Core types shared by the store, the remote API and the repository.
//!
//! Field names follow the server's JSON (camelCase). Two fields are purely
//! local: `hidden` marks posts fetched by the newer-count poller that the
//! user has not asked to see yet, and `owned_by_me` is derived from the
//! session when remote posts are written to the store.

use serde::{Deserialize, Deserializer, Serialize, de};
use std::fmt;
use std::str::FromStr;

/// A single post in the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Server-assigned id; 0 for a draft that was never saved
    pub id: i64,
    /// Display name of the author
    pub author: String,
    /// Server id of the author
    pub author_id: i64,
    /// Post body
    pub content: String,
    /// Publication time, Unix seconds
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub published: i64,
    /// Whether the current user liked this post
    pub liked_by_me: bool,
    /// Like counter
    #[serde(default)]
    pub likes: i64,
    /// Avatar file name or url of the author
    #[serde(default)]
    pub author_avatar: String,
    /// Optional media attachment
    #[serde(default)]
    pub attachment: Option<Attachment>,
    /// Whether the current session authored this post
    #[serde(default)]
    pub owned_by_me: bool,
    /// Fetched but not surfaced yet
    #[serde(default, skip_serializing)]
    pub hidden: bool,
}

impl Post {
    /// Create an unsaved draft with the given content.
    pub fn draft(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Whether this post was never saved on the server.
    pub fn is_draft(&self) -> bool {
        self.id == 0
    }

    /// Derive `owned_by_me` from the signed-in user id.
    pub fn with_owner(mut self, user_id: Option<i64>) -> Self {
        self.owned_by_me = user_id.is_some_and(|id| id == self.author_id);
        self
    }
}

/// Accept a timestamp sent either as a JSON number or as a numeric string.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Timestamp {
        Seconds(i64),
        Text(String),
    }

    match Timestamp::deserialize(deserializer)? {
        Timestamp::Seconds(seconds) => Ok(seconds),
        Timestamp::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid timestamp: {:?}", text))),
    }
}

/// Media attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Url (or server media id) of the attachment
    pub url: String,
    /// Kind of media
    #[serde(rename = "type")]
    pub kind: AttachmentType,
}

/// Kind of media behind an [`Attachment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttachmentType {
    /// Still image
    Image,
    /// Video clip
    Video,
    /// Audio clip
    Audio,
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentType::Image => write!(f, "IMAGE"),
            AttachmentType::Video => write!(f, "VIDEO"),
            AttachmentType::Audio => write!(f, "AUDIO"),
        }
    }
}

impl FromStr for AttachmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IMAGE" => Ok(AttachmentType::Image),
            "VIDEO" => Ok(AttachmentType::Video),
            "AUDIO" => Ok(AttachmentType::Audio),
            other => Err(format!("unknown attachment type: {}", other)),
        }
    }
}

/// Server response to a media upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Server-side media id, used as the attachment url
    pub id: String,
}

impl Media {
    /// The attachment a post should carry to reference this media.
    pub fn to_attachment(&self) -> Attachment {
        Attachment {
            url: self.id.clone(),
            kind: AttachmentType::Image,
        }
    }
}

/// A local file waiting to be uploaded alongside a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    /// File name sent in the multipart header
    pub file_name: String,
    /// Raw file content
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    /// Read a file from disk into an upload.
    pub fn from_path(path: &std::path::Path) -> crate::error::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self { file_name, bytes })
    }
}

/// Credentials returned by sign-in and sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// User id
    pub id: i64,
    /// Bearer token for authenticated requests
    pub token: String,
}

/// Paging direction a remote key bookmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Newest id fetched so far
    After,
    /// Oldest id fetched so far
    Before,
}

impl KeyKind {
    /// Column value used by the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::After => "AFTER",
            KeyKind::Before => "BEFORE",
        }
    }
}

/// Bookmark of the id boundary already fetched in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteKey {
    /// Direction of the bookmark
    pub kind: KeyKind,
    /// Post id at the boundary
    pub id: i64,
}

impl RemoteKey {
    /// Bookmark the newest fetched id.
    pub fn after(id: i64) -> Self {
        Self {
            kind: KeyKind::After,
            id,
        }
    }

    /// Bookmark the oldest fetched id.
    pub fn before(id: i64) -> Self {
        Self {
            kind: KeyKind::Before,
            id,
        }
    }
}
