// -- Limits --

/// Longest accepted login, matching the `usr.login` column width.
pub const MAX_LOGIN_LEN: usize = 50;

pub const MAX_PHONE_LEN: usize = 16;

pub const MAX_MESSAGE_LEN: usize = 300;

// -- Accounts --

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}
