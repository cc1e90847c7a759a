use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const SCHEMA_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE user_list (
                list_id     INTEGER PRIMARY KEY AUTOINCREMENT,
                list_type   TEXT NOT NULL CHECK (list_type IN ('contact', 'block'))
            );

            CREATE TABLE usr (
                login           TEXT PRIMARY KEY,
                phone_num       TEXT,
                password        TEXT NOT NULL,
                block_list      INTEGER NOT NULL REFERENCES user_list(list_id),
                contact_list    INTEGER NOT NULL REFERENCES user_list(list_id)
            );

            CREATE TABLE user_list_contains (
                list_id         INTEGER NOT NULL REFERENCES user_list(list_id),
                list_member     TEXT NOT NULL REFERENCES usr(login) ON DELETE CASCADE,
                PRIMARY KEY (list_id, list_member)
            );

            CREATE TABLE chat (
                chat_id         INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_type       TEXT NOT NULL CHECK (chat_type IN ('private', 'public')),
                init_sender     TEXT NOT NULL REFERENCES usr(login)
            );

            CREATE TABLE chat_list (
                chat_id         INTEGER NOT NULL REFERENCES chat(chat_id),
                member          TEXT NOT NULL REFERENCES usr(login) ON DELETE CASCADE,
                PRIMARY KEY (chat_id, member)
            );

            CREATE TABLE message (
                msg_id          INTEGER PRIMARY KEY AUTOINCREMENT,
                msg_text        TEXT NOT NULL,
                msg_timestamp   TEXT NOT NULL,
                sender_login    TEXT NOT NULL REFERENCES usr(login),
                chat_id         INTEGER NOT NULL REFERENCES chat(chat_id)
            );

            CREATE INDEX idx_message_chat
                ON message(chat_id, msg_timestamp);

            CREATE INDEX idx_chat_init_sender
                ON chat(init_sender);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", SCHEMA_VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerunning_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
