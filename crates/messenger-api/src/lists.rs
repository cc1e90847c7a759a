use tracing::{info, warn};

use messenger_db::Database;
use messenger_types::models::ListKind;

use crate::{MessengerError, Result, Session};

pub fn add(db: &Database, session: &Session, kind: ListKind, target: &str) -> Result<()> {
    let target = target.trim();
    if target.is_empty() {
        warn!(owner = session.login(), list = %kind, "list add refused: empty login");
        return Err(MessengerError::Validation("Enter a user login".into()));
    }
    if target == session.login() {
        warn!(owner = session.login(), list = %kind, "list add refused: owner cannot list themselves");
        return Err(MessengerError::Validation(format!(
            "You cannot add yourself to your {} list",
            kind
        )));
    }
    if !db.user_exists(target)? {
        warn!(owner = session.login(), member = target, list = %kind, "list add refused: unknown user");
        return Err(MessengerError::not_found("User", target));
    }

    let list_id = owned_list(db, session, kind)?;
    if db.is_list_member(list_id, target)? {
        warn!(owner = session.login(), member = target, list = %kind, "list add refused: already listed");
        return Err(MessengerError::Conflict(format!(
            "{} is already on your {} list",
            target, kind
        )));
    }

    db.add_list_member(list_id, target)?;
    info!(owner = session.login(), member = target, list = %kind, "list member added");
    Ok(())
}

pub fn remove(db: &Database, session: &Session, kind: ListKind, target: &str) -> Result<()> {
    let target = target.trim();
    let list_id = owned_list(db, session, kind)?;

    if db.remove_list_member(list_id, target)? == 0 {
        warn!(owner = session.login(), member = target, list = %kind, "list remove refused: not listed");
        return Err(MessengerError::not_found(member_label(kind), target));
    }

    info!(owner = session.login(), member = target, list = %kind, "list member removed");
    Ok(())
}

/// Member logins in alphabetical order. An empty list is not an error.
pub fn members(db: &Database, session: &Session, kind: ListKind) -> Result<Vec<String>> {
    let list_id = owned_list(db, session, kind)?;
    Ok(db.list_members(list_id)?)
}

fn owned_list(db: &Database, session: &Session, kind: ListKind) -> Result<i64> {
    db.owned_list_id(session.login(), kind)?
        .ok_or_else(|| MessengerError::not_found("User", session.login()))
}

fn member_label(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Contact => "Contact",
        ListKind::Block => "Blocked user",
    }
}
