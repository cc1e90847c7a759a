use crate::models::{ChatRow, MessageRow, UserRow};
use crate::Database;
use anyhow::Result;
use messenger_types::models::{ChatKind, ListKind};
use rusqlite::{Connection, Row};
use tracing::debug;

impl Database {
    // -- Users --

    /// Inserts a fresh block list, a fresh contact list and the user row
    /// referencing both. All three rows land together or not at all.
    pub fn create_user(&self, login: &str, password_hash: &str, phone: Option<&str>) -> Result<()> {
        self.with_tx(|conn| {
            let block_list = insert_user_list(conn, ListKind::Block)?;
            let contact_list = insert_user_list(conn, ListKind::Contact)?;
            conn.execute(
                "INSERT INTO usr (login, phone_num, password, block_list, contact_list)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![login, phone, password_hash, block_list, contact_list],
            )?;
            debug!(login, block_list, contact_list, "user row inserted");
            Ok(())
        })
    }

    pub fn get_user(&self, login: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, login))
    }

    pub fn user_exists(&self, login: &str) -> Result<bool> {
        self.with_conn(|conn| user_exists(conn, login))
    }

    pub fn count_initiated_chats(&self, login: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM chat WHERE init_sender = ?1",
                [login],
                |row| row.get(0),
            )?)
        })
    }

    /// Removes the user along with everything that references them except
    /// chats they initiated; those make the transaction fail on the
    /// `chat.init_sender` foreign key. Returns false if no such user.
    pub fn delete_user(&self, login: &str) -> Result<bool> {
        self.with_tx(|conn| {
            let Some(user) = query_user(conn, login)? else {
                return Ok(false);
            };

            conn.execute("DELETE FROM message WHERE sender_login = ?1", [login])?;
            conn.execute("DELETE FROM chat_list WHERE member = ?1", [login])?;
            conn.execute("DELETE FROM user_list_contains WHERE list_member = ?1", [login])?;
            conn.execute(
                "DELETE FROM user_list_contains WHERE list_id IN (?1, ?2)",
                (user.block_list, user.contact_list),
            )?;
            conn.execute("DELETE FROM usr WHERE login = ?1", [login])?;
            conn.execute(
                "DELETE FROM user_list WHERE list_id IN (?1, ?2)",
                (user.block_list, user.contact_list),
            )?;
            Ok(true)
        })
    }

    // -- Contact / block lists --

    /// Id of the owner's contact or block list.
    pub fn owned_list_id(&self, login: &str, kind: ListKind) -> Result<Option<i64>> {
        let sql = match kind {
            ListKind::Contact => "SELECT contact_list FROM usr WHERE login = ?1",
            ListKind::Block => "SELECT block_list FROM usr WHERE login = ?1",
        };
        self.with_conn(|conn| conn.query_row(sql, [login], |row| row.get(0)).optional())
    }

    pub fn add_list_member(&self, list_id: i64, member: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_list_contains (list_id, list_member) VALUES (?1, ?2)",
                rusqlite::params![list_id, member],
            )?;
            Ok(())
        })
    }

    /// Returns the number of rows removed (0 or 1).
    pub fn remove_list_member(&self, list_id: i64, member: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM user_list_contains WHERE list_id = ?1 AND list_member = ?2",
                rusqlite::params![list_id, member],
            )?)
        })
    }

    pub fn is_list_member(&self, list_id: i64, member: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT 1 FROM user_list_contains WHERE list_id = ?1 AND list_member = ?2",
                    rusqlite::params![list_id, member],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
    }

    pub fn list_members(&self, list_id: i64) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT list_member FROM user_list_contains WHERE list_id = ?1 ORDER BY list_member",
            )?;
            let rows = stmt
                .query_map([list_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    // -- Chats --

    /// Inserts the chat and one membership row per member. The new id comes
    /// from the insert itself, so concurrent creators cannot swap ids.
    pub fn create_chat(&self, kind: ChatKind, init_sender: &str, members: &[String]) -> Result<i64> {
        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO chat (chat_type, init_sender) VALUES (?1, ?2)",
                (kind.as_str(), init_sender),
            )?;
            let chat_id = conn.last_insert_rowid();

            let mut stmt = conn.prepare("INSERT INTO chat_list (chat_id, member) VALUES (?1, ?2)")?;
            for member in members {
                stmt.execute(rusqlite::params![chat_id, member])?;
                debug!(chat_id, member = member.as_str(), "chat member added");
            }
            Ok(chat_id)
        })
    }

    pub fn get_chat(&self, chat_id: i64) -> Result<Option<ChatRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT chat_id, chat_type, init_sender FROM chat WHERE chat_id = ?1",
                [chat_id],
                chat_row,
            )
            .optional()
        })
    }

    /// Messages first, then memberships, then the chat row, in one transaction.
    pub fn delete_chat(&self, chat_id: i64) -> Result<()> {
        self.with_tx(|conn| {
            let messages = conn.execute("DELETE FROM message WHERE chat_id = ?1", [chat_id])?;
            let members = conn.execute("DELETE FROM chat_list WHERE chat_id = ?1", [chat_id])?;
            conn.execute("DELETE FROM chat WHERE chat_id = ?1", [chat_id])?;
            debug!(chat_id, messages, members, "chat rows removed");
            Ok(())
        })
    }

    pub fn add_chat_member(&self, chat_id: i64, member: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_list (chat_id, member) VALUES (?1, ?2)",
                rusqlite::params![chat_id, member],
            )?;
            Ok(())
        })
    }

    pub fn remove_chat_member(&self, chat_id: i64, member: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM chat_list WHERE chat_id = ?1 AND member = ?2",
                rusqlite::params![chat_id, member],
            )?)
        })
    }

    pub fn is_chat_member(&self, chat_id: i64, member: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT 1 FROM chat_list WHERE chat_id = ?1 AND member = ?2",
                    rusqlite::params![chat_id, member],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
    }

    pub fn chat_members(&self, chat_id: i64) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT member FROM chat_list WHERE chat_id = ?1 ORDER BY member")?;
            let rows = stmt
                .query_map([chat_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    pub fn chats_for_member(&self, member: &str) -> Result<Vec<ChatRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.chat_id, c.chat_type, c.init_sender
                 FROM chat c
                 JOIN chat_list l ON l.chat_id = c.chat_id
                 WHERE l.member = ?1
                 ORDER BY c.chat_id",
            )?;
            let rows = stmt
                .query_map([member], chat_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn chats_initiated_by(&self, init_sender: &str) -> Result<Vec<ChatRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, chat_type, init_sender FROM chat WHERE init_sender = ?1 ORDER BY chat_id",
            )?;
            let rows = stmt
                .query_map([init_sender], chat_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, chat_id: i64, sender: &str, text: &str, timestamp: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message (msg_text, msg_timestamp, sender_login, chat_id) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![text, timestamp, sender, chat_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_message(&self, msg_id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT msg_id, msg_text, msg_timestamp, sender_login, chat_id FROM message WHERE msg_id = ?1",
                [msg_id],
                message_row,
            )
            .optional()
        })
    }

    pub fn update_message_text(&self, msg_id: i64, text: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE message SET msg_text = ?1 WHERE msg_id = ?2",
                rusqlite::params![text, msg_id],
            )?)
        })
    }

    pub fn delete_message(&self, msg_id: i64) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM message WHERE msg_id = ?1", [msg_id])?))
    }

    /// Newest first. Ties on timestamp fall back to insertion order.
    pub fn recent_messages(&self, chat_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT msg_id, msg_text, msg_timestamp, sender_login, chat_id
                 FROM message
                 WHERE chat_id = ?1
                 ORDER BY msg_timestamp DESC, msg_id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![chat_id, limit], message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn recent_messages_by(&self, chat_id: i64, sender: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT msg_id, msg_text, msg_timestamp, sender_login, chat_id
                 FROM message
                 WHERE chat_id = ?1 AND sender_login = ?2
                 ORDER BY msg_timestamp DESC, msg_id DESC
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![chat_id, sender, limit], message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn insert_user_list(conn: &Connection, kind: ListKind) -> Result<i64> {
    conn.execute("INSERT INTO user_list (list_type) VALUES (?1)", [kind.as_str()])?;
    Ok(conn.last_insert_rowid())
}

fn user_exists(conn: &Connection, login: &str) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM usr WHERE login = ?1", [login], |_| Ok(()))
        .optional()?
        .is_some())
}

fn query_user(conn: &Connection, login: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT login, phone_num, password, block_list, contact_list FROM usr WHERE login = ?1",
    )?;

    let row = stmt
        .query_row([login], |row| {
            Ok(UserRow {
                login: row.get(0)?,
                phone_num: row.get(1)?,
                password: row.get(2)?,
                block_list: row.get(3)?,
                contact_list: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn chat_row(row: &Row<'_>) -> rusqlite::Result<ChatRow> {
    Ok(ChatRow {
        chat_id: row.get(0)?,
        chat_type: row.get(1)?,
        init_sender: row.get(2)?,
    })
}

fn message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        msg_id: row.get(0)?,
        msg_text: row.get(1)?,
        msg_timestamp: row.get(2)?,
        sender_login: row.get(3)?,
        chat_id: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
