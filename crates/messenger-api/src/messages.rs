use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use tracing::{info, warn};

use messenger_db::Database;
use messenger_db::models::MessageRow;
use messenger_types::api::MAX_MESSAGE_LEN;
use messenger_types::models::Message;

use crate::{MessengerError, Result, Session, chats};

/// Messages shown when a chat is first opened.
pub const DEFAULT_LIMIT: u32 = 10;

/// How many more messages each "load more" asks for.
pub const PAGE_STEP: u32 = 10;

/// How far back a chat view reaches. "Load more" re-queries with a larger
/// limit rather than a cursor, so rows can shift when new messages arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageWindow {
    limit: u32,
}

impl Default for MessageWindow {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
        }
    }
}

impl MessageWindow {
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Widens the window by one page and returns the new limit.
    pub fn load_more(&mut self) -> u32 {
        self.limit = self.limit.saturating_add(PAGE_STEP);
        self.limit
    }
}

pub fn send(db: &Database, session: &Session, chat_id: i64, text: &str) -> Result<Message> {
    validate_text(text)?;
    require_member(db, session, chat_id)?;

    let sent_at = Utc::now().trunc_subsecs(6);
    let id = db.insert_message(chat_id, session.login(), text, &format_timestamp(sent_at))?;

    info!(msg_id = id, chat_id, sender = session.login(), "message sent");
    Ok(Message {
        id,
        chat_id,
        sender: session.login().to_string(),
        text: text.to_string(),
        sent_at,
    })
}

/// Replaces the text of one of the session's own messages.
pub fn edit(db: &Database, session: &Session, msg_id: i64, text: &str) -> Result<()> {
    validate_text(text)?;
    authored(db, session, msg_id)?;

    db.update_message_text(msg_id, text)?;
    info!(msg_id, sender = session.login(), "message edited");
    Ok(())
}

/// Deletes one of the session's own messages.
pub fn delete(db: &Database, session: &Session, msg_id: i64) -> Result<()> {
    authored(db, session, msg_id)?;

    db.delete_message(msg_id)?;
    info!(msg_id, sender = session.login(), "message deleted");
    Ok(())
}

/// The chat's newest `limit` messages, newest first.
pub fn recent(db: &Database, session: &Session, chat_id: i64, limit: u32) -> Result<Vec<Message>> {
    require_member(db, session, chat_id)?;
    db.recent_messages(chat_id, limit)?
        .into_iter()
        .map(to_message)
        .collect()
}

/// Like [`recent`], restricted to messages the session's user sent.
pub fn recent_own(db: &Database, session: &Session, chat_id: i64, limit: u32) -> Result<Vec<Message>> {
    require_member(db, session, chat_id)?;
    db.recent_messages_by(chat_id, session.login(), limit)?
        .into_iter()
        .map(to_message)
        .collect()
}

fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(MessengerError::Validation("Message must not be empty".into()));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(MessengerError::Validation(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    Ok(())
}

fn require_member(db: &Database, session: &Session, chat_id: i64) -> Result<()> {
    chats::find(db, chat_id)?;
    if !db.is_chat_member(chat_id, session.login())? {
        return Err(MessengerError::Forbidden(format!(
            "You are not a member of chat {}",
            chat_id
        )));
    }
    Ok(())
}

fn authored(db: &Database, session: &Session, msg_id: i64) -> Result<MessageRow> {
    let row = db
        .get_message(msg_id)?
        .ok_or_else(|| MessengerError::not_found("Message", msg_id))?;
    if row.sender_login != session.login() {
        warn!(msg_id, login = session.login(), "attempt to change another user's message");
        return Err(MessengerError::Forbidden(
            "You can only change your own messages".into(),
        ));
    }
    Ok(row)
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_message(row: MessageRow) -> Result<Message> {
    let sent_at = row
        .msg_timestamp
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand or by SQLite's datetime() lack a zone; read them as UTC.
            NaiveDateTime::parse_from_str(&row.msg_timestamp, "%Y-%m-%d %H:%M:%S%.f")
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            MessengerError::Database(anyhow::anyhow!(
                "Corrupt msg_timestamp '{}' on message {}: {}",
                row.msg_timestamp,
                row.msg_id,
                e
            ))
        })?;

    Ok(Message {
        id: row.msg_id,
        chat_id: row.chat_id,
        sender: row.sender_login,
        text: row.msg_text,
        sent_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::db_with_users;

    fn chat_between(db: &Database, initiator: &Session, others: &[&str]) -> i64 {
        let others: Vec<String> = others.iter().map(|o| o.to_string()).collect();
        chats::create(db, initiator, &others).unwrap().id
    }

    #[test]
    fn window_grows_by_a_page() {
        let mut window = MessageWindow::default();
        assert_eq!(window.limit(), 10);
        assert_eq!(window.load_more(), 20);
        assert_eq!(window.load_more(), 30);
        assert_eq!(window.limit(), 30);
    }

    #[test]
    fn sent_messages_come_back_newest_first() {
        let (db, sessions) = db_with_users(&["alice", "bob"]);
        let (alice, bob) = (&sessions[0], &sessions[1]);
        let chat_id = chat_between(&db, alice, &["bob"]);

        let first = send(&db, alice, chat_id, "hi bob").unwrap();
        let second = send(&db, bob, chat_id, "hi alice").unwrap();

        let listed = recent(&db, alice, chat_id, 10).unwrap();
        assert_eq!(listed, vec![second.clone(), first]);

        let limited = recent(&db, bob, chat_id, 1).unwrap();
        assert_eq!(limited, vec![second]);
    }

    #[test]
    fn own_messages_only_lists_the_sender() {
        let (db, sessions) = db_with_users(&["alice", "bob"]);
        let (alice, bob) = (&sessions[0], &sessions[1]);
        let chat_id = chat_between(&db, alice, &["bob"]);
        send(&db, alice, chat_id, "one").unwrap();
        send(&db, bob, chat_id, "two").unwrap();

        let own = recent_own(&db, bob, chat_id, 10).unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].text, "two");
    }

    #[test]
    fn non_members_cannot_read_or_write() {
        let (db, sessions) = db_with_users(&["alice", "bob", "carol"]);
        let chat_id = chat_between(&db, &sessions[0], &["bob"]);
        let carol = &sessions[2];

        assert!(matches!(
            send(&db, carol, chat_id, "let me in"),
            Err(MessengerError::Forbidden(_))
        ));
        assert!(matches!(
            recent(&db, carol, chat_id, 10),
            Err(MessengerError::Forbidden(_))
        ));
        assert!(matches!(
            send(&db, carol, 999, "anyone?"),
            Err(MessengerError::NotFound { .. })
        ));
    }

    #[test]
    fn only_the_sender_edits_or_deletes() {
        let (db, sessions) = db_with_users(&["alice", "bob"]);
        let (alice, bob) = (&sessions[0], &sessions[1]);
        let chat_id = chat_between(&db, alice, &["bob"]);
        let msg = send(&db, alice, chat_id, "original").unwrap();

        assert!(matches!(
            edit(&db, bob, msg.id, "tampered"),
            Err(MessengerError::Forbidden(_))
        ));
        assert!(matches!(delete(&db, bob, msg.id), Err(MessengerError::Forbidden(_))));
        assert_eq!(recent(&db, alice, chat_id, 10).unwrap()[0].text, "original");

        edit(&db, alice, msg.id, "revised").unwrap();
        assert_eq!(recent(&db, alice, chat_id, 10).unwrap()[0].text, "revised");

        delete(&db, alice, msg.id).unwrap();
        assert!(recent(&db, alice, chat_id, 10).unwrap().is_empty());
        assert!(matches!(
            delete(&db, alice, msg.id),
            Err(MessengerError::NotFound { .. })
        ));
    }

    #[test]
    fn blank_and_oversized_text_is_rejected() {
        let (db, sessions) = db_with_users(&["alice"]);
        let chat_id = chat_between(&db, &sessions[0], &[]);

        let too_long = "x".repeat(MAX_MESSAGE_LEN + 1);
        for text in ["", "   ", too_long.as_str()] {
            assert!(matches!(
                send(&db, &sessions[0], chat_id, text),
                Err(MessengerError::Validation(_))
            ));
        }
        send(&db, &sessions[0], chat_id, &"x".repeat(MAX_MESSAGE_LEN)).unwrap();
    }

    #[test]
    fn zoneless_timestamps_are_read_as_utc() {
        let row = MessageRow {
            msg_id: 7,
            msg_text: "legacy".into(),
            msg_timestamp: "2024-03-01 12:30:00".into(),
            sender_login: "alice".into(),
            chat_id: 1,
        };
        let msg = to_message(row).unwrap();
        assert_eq!(format_timestamp(msg.sent_at), "2024-03-01T12:30:00.000000Z");
    }
}
