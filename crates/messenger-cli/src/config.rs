use std::fmt;
use std::path::{Path, PathBuf};

use messenger_api::MessengerError;
use messenger_db::Database;

const IN_MEMORY: &str = ":memory:";

/// Settings read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory bare database names resolve into.
    pub db_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let db_dir = std::env::var("MESSENGER_DB_DIR").unwrap_or_else(|_| ".".into());
        Self {
            db_dir: db_dir.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    InMemory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// `:memory:` stays in memory, anything that looks like a path is used
    /// as-is, and a bare name becomes `<db_dir>/<name>.db`.
    pub fn resolve(name: &str, db_dir: &Path) -> Self {
        if name == IN_MEMORY {
            return DatabaseLocation::InMemory;
        }
        let looks_like_path = name.contains(std::path::MAIN_SEPARATOR)
            || name.contains('/')
            || name.ends_with(".db");
        if looks_like_path {
            DatabaseLocation::File(PathBuf::from(name))
        } else {
            DatabaseLocation::File(db_dir.join(format!("{}.db", name)))
        }
    }
}

/// Where and as whom this process connects. The embedded store has no
/// server, so port and user only appear in the connection URL and logs.
#[derive(Debug, Clone)]
pub struct ConnectionTarget {
    pub location: DatabaseLocation,
    pub port: u16,
    pub user: String,
}

impl ConnectionTarget {
    pub fn new(database: &str, port: u16, user: String, config: &Config) -> Self {
        Self {
            location: DatabaseLocation::resolve(database, &config.db_dir),
            port,
            user,
        }
    }

    pub fn open(&self) -> Result<Database, MessengerError> {
        match &self.location {
            DatabaseLocation::InMemory => Database::open_in_memory(),
            DatabaseLocation::File(path) => Database::open(path),
        }
        .map_err(MessengerError::Connection)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = match &self.location {
            DatabaseLocation::InMemory => IN_MEMORY.to_string(),
            DatabaseLocation::File(path) => path.display().to_string(),
        };
        write!(f, "sqlite://{}?user={}&port={}", location, self.user, self.port)
    }
}
