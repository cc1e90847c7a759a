//! Account, list, chat and message operations.
//!
//! Every operation takes the [`Database`](messenger_db::Database) explicitly;
//! operations performed as a logged-in user also take their [`Session`].

pub mod accounts;
pub mod chats;
pub mod error;
pub mod lists;
pub mod messages;
pub mod session;

pub use error::{MessengerError, Result};
pub use session::Session;
