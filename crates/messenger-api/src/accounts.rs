use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use tracing::{info, warn};

use messenger_db::Database;
use messenger_types::api::{LoginRequest, MAX_LOGIN_LEN, MAX_PHONE_LEN, RegisterRequest};
use messenger_types::models::AccountDeletion;

use crate::{MessengerError, Result, Session};

/// Creates the user together with an empty contact list and block list.
pub fn register(db: &Database, req: &RegisterRequest) -> Result<()> {
    // Validate input
    validate_login(&req.login)?;
    if req.password.is_empty() {
        return Err(MessengerError::Validation("Password must not be empty".into()));
    }
    let phone = req.phone.trim();
    if phone.chars().count() > MAX_PHONE_LEN {
        return Err(MessengerError::Validation(format!(
            "Phone number must be at most {} characters",
            MAX_PHONE_LEN
        )));
    }

    // Check if login is taken
    if db.user_exists(&req.login)? {
        return Err(already_exists(&req.login));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| MessengerError::Database(anyhow::anyhow!("Password hashing failed: {}", e)))?
        .to_string();

    let phone = (!phone.is_empty()).then_some(phone);
    db.create_user(&req.login, &password_hash, phone)
        .map_err(|e| match MessengerError::from(e) {
            MessengerError::Conflict(_) => already_exists(&req.login),
            other => other,
        })?;

    info!(login = %req.login, "account created");
    Ok(())
}

/// Unknown login and wrong password look the same to the caller.
pub fn login(db: &Database, req: &LoginRequest) -> Result<Session> {
    let not_found = || MessengerError::not_found("User", &req.login);

    let user = db.get_user(&req.login)?.ok_or_else(not_found)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
        MessengerError::Database(anyhow::anyhow!(
            "Stored password hash for '{}' is unreadable: {}",
            user.login,
            e
        ))
    })?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!(login = %req.login, "password mismatch");
            not_found()
        })?;

    info!(login = %user.login, "logged in");
    Ok(Session::new(user.login))
}

/// Deletes the session's account unless it initiated a chat, in which case
/// nothing changes and `Refused` comes back.
pub fn delete_account(db: &Database, session: &Session) -> Result<AccountDeletion> {
    let owned = db.count_initiated_chats(session.login())?;
    if owned > 0 {
        warn!(login = session.login(), owned, "account owns chats, not deleting");
        return Ok(AccountDeletion::Refused);
    }

    if !db.delete_user(session.login())? {
        return Err(MessengerError::not_found("User", session.login()));
    }

    info!(login = session.login(), "account deleted");
    Ok(AccountDeletion::Deleted)
}

fn validate_login(login: &str) -> Result<()> {
    if login.trim().is_empty() {
        return Err(MessengerError::Validation("Login must not be empty".into()));
    }
    if login.trim() != login {
        return Err(MessengerError::Validation(
            "Login must not start or end with whitespace".into(),
        ));
    }
    if login.chars().count() > MAX_LOGIN_LEN {
        return Err(MessengerError::Validation(format!(
            "Login must be at most {} characters",
            MAX_LOGIN_LEN
        )));
    }
    Ok(())
}

fn already_exists(login: &str) -> MessengerError {
    MessengerError::Conflict(format!("User '{}' already exists", login))
}
