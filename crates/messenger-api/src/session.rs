/// The logged-in user every per-user operation acts as.
///
/// Only [`crate::accounts::login`] hands these out, so holding one means the
/// password was checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    login: String,
}

impl Session {
    pub(crate) fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }
}
