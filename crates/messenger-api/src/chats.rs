use tracing::{info, warn};

use messenger_db::Database;
use messenger_db::models::ChatRow;
use messenger_types::models::{Chat, ChatKind, ChatSummary};

use crate::{MessengerError, Result, Session};

/// Starts a chat between the session's user and `invitees`.
///
/// The initiator is always a member. Blank and repeated invitees (including
/// the initiator) are skipped; every remaining invitee must exist. The type
/// is fixed here from the participant count and never changes afterwards.
pub fn create(db: &Database, session: &Session, invitees: &[String]) -> Result<Chat> {
    let mut members = vec![session.login().to_string()];
    for invitee in invitees {
        let login = invitee.trim();
        if login.is_empty() || members.iter().any(|m| m == login) {
            continue;
        }
        if !db.user_exists(login)? {
            warn!(initiator = session.login(), invitee = login, "chat creation refused: unknown invitee");
            return Err(MessengerError::not_found("User", login));
        }
        members.push(login.to_string());
    }

    let kind = ChatKind::for_participants(members.len());
    let id = db.create_chat(kind, session.login(), &members)?;

    info!(
        chat_id = id,
        initiator = session.login(),
        kind = %kind,
        members = members.len(),
        "chat created"
    );
    Ok(Chat {
        id,
        kind,
        initiator: session.login().to_string(),
    })
}

/// Removes the chat with all its messages and memberships. Initiator only.
pub fn delete(db: &Database, session: &Session, chat_id: i64) -> Result<()> {
    managed_chat(db, session, chat_id)?;
    db.delete_chat(chat_id)?;
    info!(chat_id, initiator = session.login(), "chat deleted");
    Ok(())
}

pub fn add_member(db: &Database, session: &Session, chat_id: i64, login: &str) -> Result<()> {
    managed_chat(db, session, chat_id)?;

    let login = login.trim();
    if !db.user_exists(login)? {
        warn!(chat_id, member = login, "chat member add refused: unknown user");
        return Err(MessengerError::not_found("User", login));
    }
    if db.is_chat_member(chat_id, login)? {
        warn!(chat_id, member = login, "chat member add refused: already a member");
        return Err(MessengerError::Conflict(format!(
            "{} is already a member of chat {}",
            login, chat_id
        )));
    }

    db.add_chat_member(chat_id, login)?;
    info!(chat_id, member = login, "chat member added");
    Ok(())
}

pub fn remove_member(db: &Database, session: &Session, chat_id: i64, login: &str) -> Result<()> {
    let chat = managed_chat(db, session, chat_id)?;

    let login = login.trim();
    if login == chat.initiator {
        warn!(chat_id, member = login, "chat member remove refused: initiator");
        return Err(MessengerError::Validation(
            "The chat's initiator cannot be removed; delete the chat instead".into(),
        ));
    }
    if db.remove_chat_member(chat_id, login)? == 0 {
        warn!(chat_id, member = login, "chat member remove refused: not a member");
        return Err(MessengerError::not_found("Chat member", login));
    }

    info!(chat_id, member = login, "chat member removed");
    Ok(())
}

/// Chats the session's user belongs to, oldest first.
pub fn joined(db: &Database, session: &Session) -> Result<Vec<ChatSummary>> {
    summarize(db, db.chats_for_member(session.login())?)
}

/// Chats the session's user initiated and may therefore manage.
pub fn managed(db: &Database, session: &Session) -> Result<Vec<ChatSummary>> {
    summarize(db, db.chats_initiated_by(session.login())?)
}

/// Looks the chat up and checks the session initiated it.
fn managed_chat(db: &Database, session: &Session, chat_id: i64) -> Result<Chat> {
    let chat = find(db, chat_id)?;
    if chat.initiator != session.login() {
        warn!(chat_id, login = session.login(), "chat management refused");
        return Err(MessengerError::Forbidden(format!(
            "Only {} can manage chat {}",
            chat.initiator, chat_id
        )));
    }
    Ok(chat)
}

pub(crate) fn find(db: &Database, chat_id: i64) -> Result<Chat> {
    let row = db
        .get_chat(chat_id)?
        .ok_or_else(|| MessengerError::not_found("Chat", chat_id))?;
    to_chat(row)
}

fn summarize(db: &Database, rows: Vec<ChatRow>) -> Result<Vec<ChatSummary>> {
    rows.into_iter()
        .map(|row| -> Result<ChatSummary> {
            let chat = to_chat(row)?;
            let members = db.chat_members(chat.id)?;
            Ok(ChatSummary { chat, members })
        })
        .collect()
}

fn to_chat(row: ChatRow) -> Result<Chat> {
    let kind = row.chat_type.parse::<ChatKind>().map_err(|e| {
        MessengerError::Database(anyhow::anyhow!("Corrupt chat {}: {}", row.chat_id, e))
    })?;
    Ok(Chat {
        id: row.chat_id,
        kind,
        initiator: row.init_sender,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{db_with_users, warnings};

    fn logins(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn two_participants_make_a_private_chat() {
        let (db, sessions) = db_with_users(&["alice", "bob"]);
        let chat = create(&db, &sessions[0], &logins(&["bob"])).unwrap();

        assert_eq!(chat.kind, ChatKind::Private);
        assert_eq!(chat.initiator, "alice");
        assert_eq!(db.chat_members(chat.id).unwrap(), vec!["alice", "bob"]);
    }

    #[test]
    fn three_participants_make_a_public_chat() {
        let (db, sessions) = db_with_users(&["alice", "bob", "carol"]);
        let chat = create(&db, &sessions[0], &logins(&["bob", "carol"])).unwrap();

        assert_eq!(chat.kind, ChatKind::Public);
        assert_eq!(find(&db, chat.id).unwrap(), chat);
    }

    #[test]
    fn repeated_invitees_do_not_change_the_type() {
        let (db, sessions) = db_with_users(&["alice", "bob"]);
        let chat = create(&db, &sessions[0], &logins(&["bob", " bob ", "alice", ""])).unwrap();

        assert_eq!(chat.kind, ChatKind::Private);
        assert_eq!(db.chat_members(chat.id).unwrap().len(), 2);
    }

    #[test]
    fn unknown_invitee_creates_nothing() {
        let (db, sessions) = db_with_users(&["alice", "bob"]);
        let err = create(&db, &sessions[0], &logins(&["bob", "ghost"])).unwrap_err();

        assert_eq!(err.to_string(), "User 'ghost' not found");
        assert!(managed(&db, &sessions[0]).unwrap().is_empty());
    }

    #[test]
    fn only_the_initiator_manages_members() {
        let (db, sessions) = db_with_users(&["alice", "bob", "carol"]);
        let (alice, bob) = (&sessions[0], &sessions[1]);
        let chat = create(&db, alice, &logins(&["bob"])).unwrap();

        assert!(matches!(
            add_member(&db, bob, chat.id, "carol"),
            Err(MessengerError::Forbidden(_))
        ));

        add_member(&db, alice, chat.id, "carol").unwrap();
        assert!(matches!(
            add_member(&db, alice, chat.id, "carol"),
            Err(MessengerError::Conflict(_))
        ));
        // the type stays what it was at creation
        assert_eq!(find(&db, chat.id).unwrap().kind, ChatKind::Private);

        remove_member(&db, alice, chat.id, "carol").unwrap();
        assert!(matches!(
            remove_member(&db, alice, chat.id, "carol"),
            Err(MessengerError::NotFound { .. })
        ));
        assert!(matches!(
            remove_member(&db, alice, chat.id, "alice"),
            Err(MessengerError::Validation(_))
        ));
    }

    #[test]
    fn delete_removes_messages_members_and_chat() {
        let (db, sessions) = db_with_users(&["alice", "bob"]);
        let (alice, bob) = (&sessions[0], &sessions[1]);
        let chat = create(&db, alice, &logins(&["bob"])).unwrap();
        crate::messages::send(&db, bob, chat.id, "hello").unwrap();

        assert!(matches!(delete(&db, bob, chat.id), Err(MessengerError::Forbidden(_))));
        delete(&db, alice, chat.id).unwrap();

        assert!(matches!(find(&db, chat.id), Err(MessengerError::NotFound { .. })));
        assert!(db.chat_members(chat.id).unwrap().is_empty());
        assert!(db.recent_messages(chat.id, 10).unwrap().is_empty());
        assert!(joined(&db, bob).unwrap().is_empty());
    }

    #[test]
    fn joined_and_managed_listings() {
        let (db, sessions) = db_with_users(&["alice", "bob", "carol"]);
        let (alice, bob) = (&sessions[0], &sessions[1]);
        let first = create(&db, alice, &logins(&["bob"])).unwrap();
        let second = create(&db, bob, &logins(&["alice", "carol"])).unwrap();

        let joined: Vec<i64> = joined(&db, alice).unwrap().iter().map(|s| s.chat.id).collect();
        assert_eq!(joined, vec![first.id, second.id]);

        let managed = managed(&db, bob).unwrap();
        assert_eq!(managed.len(), 1);
        assert_eq!(managed[0].chat.initiator, "bob");
        assert_eq!(managed[0].members, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn refused_membership_changes_are_logged_as_warnings() {
        let (db, sessions) = db_with_users(&["alice", "bob"]);
        let alice = &sessions[0];
        let chat = create(&db, alice, &logins(&["bob"])).unwrap();

        let (results, logged) = warnings(|| {
            [
                create(&db, alice, &logins(&["ghost"])).map(|_| ()),
                add_member(&db, alice, chat.id, "bob"),
                remove_member(&db, alice, chat.id, "alice"),
            ]
        });

        assert!(results.iter().all(|r| r.is_err()));
        assert!(logged.contains("chat creation refused: unknown invitee"));
        assert!(logged.contains("invitee=\"ghost\""));
        assert!(logged.contains("already a member"));
        assert!(logged.contains("chat member remove refused: initiator"));
    }
}
