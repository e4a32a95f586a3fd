//! Who is connected and what they may do.
//!
//! The pgwire password only proves a client may talk to the server at all.
//! What a connection may change is decided by the startup `user`: users listed
//! in the client registry get their configured scopes, everyone else is
//! anonymous.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::sql::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Create, change and delete catalog categories and items.
    Catalog,
    /// Read and manage reservations and manual blocked windows.
    Reserve,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Catalog => "catalog",
            Scope::Reserve => "reserve",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "catalog" => Ok(Scope::Catalog),
            "reserve" => Ok(Scope::Reserve),
            other => Err(IdentityError::UnknownScope(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("unknown scope {0:?}")]
    UnknownScope(String),
    #[error("malformed client entry {0:?}, expected user=scope+scope")]
    Malformed(String),
    #[error("missing scope {required} for {action}")]
    Forbidden { required: Scope, action: &'static str },
}

/// Configured clients and their scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientRegistry {
    clients: HashMap<String, BTreeSet<Scope>>,
}

impl ClientRegistry {
    /// Parse `user=scope+scope,user2=scope`. Blank entries are ignored.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let mut clients = HashMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (user, scopes) = entry
                .split_once('=')
                .ok_or_else(|| IdentityError::Malformed(entry.to_string()))?;
            let user = user.trim();
            if user.is_empty() {
                return Err(IdentityError::Malformed(entry.to_string()));
            }
            let scopes = scopes
                .split('+')
                .filter(|s| !s.trim().is_empty())
                .map(Scope::from_str)
                .collect::<Result<BTreeSet<_>, _>>()?;
            clients.insert(user.to_string(), scopes);
        }
        Ok(Self { clients })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Identity for a connecting user. Unknown users are anonymous.
    pub fn identify(&self, user: Option<&str>) -> Identity {
        match user.and_then(|u| self.clients.get_key_value(u)) {
            Some((user, scopes)) => Identity {
                user: Some(user.clone()),
                scopes: scopes.clone(),
            },
            None => Identity::anonymous(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: Option<String>,
    pub scopes: BTreeSet<Scope>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            user: None,
            scopes: BTreeSet::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }

    pub fn has(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    pub fn authorize(&self, cmd: &Command) -> Result<(), IdentityError> {
        match required_scope(cmd) {
            Some(required) if !self.has(required) => Err(IdentityError::Forbidden {
                required,
                action: crate::observability::command_label(cmd),
            }),
            _ => Ok(()),
        }
    }
}

/// Scope a command needs, or `None` when anyone may run it.
pub fn required_scope(cmd: &Command) -> Option<Scope> {
    match cmd {
        Command::InsertReservation { .. }
        | Command::SelectBlockedWindows { .. }
        | Command::SelectCategories
        | Command::SelectItems { .. }
        | Command::SelectItemPicture { .. }
        | Command::Listen { .. }
        | Command::Unlisten { .. }
        | Command::UnlistenAll => None,

        Command::UpdateReservation { .. }
        | Command::DeleteReservation { .. }
        | Command::SelectReservations { .. }
        | Command::InsertBlockedWindow { .. }
        | Command::DeleteBlockedWindow { .. }
        | Command::RefreshBlockedWindows => Some(Scope::Reserve),

        Command::InsertCategory { .. }
        | Command::DeleteCategory { .. }
        | Command::InsertItem { .. }
        | Command::UpdateItem { .. }
        | Command::DeleteItem { .. } => Some(Scope::Catalog),
    }
}
