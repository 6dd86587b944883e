//! Identifiers of records written to a backend.

use std::fmt;

use uuid::Uuid;

/// Uniquely addresses one record in a backend.
///
/// Identifiers are minted by the backend on every successful write and never change afterwards.
/// Which variant a backend hands out depends on its native addressing scheme.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// A UUID primary key or document handle.
    Uuid(Uuid),
    /// A string key, such as `key:42`.
    Key(String),
}

impl Identifier {
    /// Returns the UUID, if this identifier is UUID-based.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(uuid) => Some(*uuid),
            Self::Key(_) => None,
        }
    }

    /// Returns the string key, if this identifier is key-based.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Uuid(_) => None,
            Self::Key(key) => Some(key.as_str()),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(uuid) => write!(f, "{uuid}"),
            Self::Key(key) => f.write_str(key),
        }
    }
}
