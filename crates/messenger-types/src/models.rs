use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A stored enum column held a value this build does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Chat visibility, fixed when the chat is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatKind {
    Private,
    Public,
}

impl ChatKind {
    /// Two participants (initiator plus one) make a private chat, more make a public one.
    pub fn for_participants(total: usize) -> Self {
        if total <= 2 {
            ChatKind::Private
        } else {
            ChatKind::Public
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Public => "public",
        }
    }
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "private" => Ok(ChatKind::Private),
            "public" => Ok(ChatKind::Public),
            other => Err(UnknownVariant {
                kind: "chat type",
                value: other.to_string(),
            }),
        }
    }
}

/// The two per-user membership sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Contact,
    Block,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Contact => "contact",
            ListKind::Block => "block",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "contact" => Ok(ListKind::Contact),
            "block" => Ok(ListKind::Block),
            other => Err(UnknownVariant {
                kind: "list type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
    pub kind: ChatKind,
    pub initiator: String,
}

/// A chat together with its current member logins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub chat: Chat,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub sender: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Result of an account deletion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountDeletion {
    Deleted,
    /// The account initiated at least one chat and was kept.
    Refused,
}
