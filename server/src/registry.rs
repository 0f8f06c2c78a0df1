//! Connection registry for the party server
//!
//! This module tracks what the server knows about each live connection:
//! - The role the connection registered as (submitter or display)
//! - The user profile attached once a submitter sends its info
//!
//! Records are keyed by the opaque connection handle handed out by the
//! network layer. They are removed explicitly when the transport closes,
//! and wiped wholesale when a display resets the game.

use log::{info, warn};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opaque per-connection handle assigned by the acceptor
pub type ConnectionId = u32;

/// What a connection does in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A phone that submits balloons and throws darts ("mobile")
    Submitter,
    /// The shared big screen that starts and resets rounds ("screen")
    Display,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown client type '{0}'")]
pub struct UnknownClientType(pub String);

impl FromStr for Role {
    type Err = UnknownClientType;

    /// Parses the client type sent with `registerClient`
    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        match kind {
            "mobile" => Ok(Role::Submitter),
            "screen" => Ok(Role::Display),
            other => Err(UnknownClientType(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Submitter => write!(f, "mobile"),
            Role::Display => write!(f, "screen"),
        }
    }
}

/// Identity a submitter gives itself when sending its info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub display_name: String,
}

/// Everything known about one connection
///
/// Either field may be unset: a phone can submit before registering, and a
/// screen never attaches a profile.
#[derive(Debug, Default, Clone)]
pub struct ConnectionRecord {
    pub role: Option<Role>,
    pub profile: Option<UserProfile>,
}

/// Maps live connections to their role and profile
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionRecord>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    /// Records the role for a connection
    ///
    /// Unknown client types are logged and leave the registry untouched.
    /// Registering again overwrites the previous role but keeps the profile.
    /// Returns the role that was stored, if any.
    pub fn register(&mut self, connection: ConnectionId, kind: &str) -> Option<Role> {
        match kind.parse::<Role>() {
            Ok(role) => {
                self.connections.entry(connection).or_default().role = Some(role);
                info!("Client {} registered as {}", connection, role);
                Some(role)
            }
            Err(e) => {
                warn!("Ignoring registration from client {}: {}", connection, e);
                None
            }
        }
    }

    pub fn lookup(&self, connection: ConnectionId) -> Option<Role> {
        self.connections
            .get(&connection)
            .and_then(|record| record.role)
    }

    /// Stores or replaces the profile for a connection
    pub fn attach_profile(&mut self, connection: ConnectionId, profile: UserProfile) {
        self.connections.entry(connection).or_default().profile = Some(profile);
    }

    pub fn profile(&self, connection: ConnectionId) -> Option<&UserProfile> {
        self.connections
            .get(&connection)
            .and_then(|record| record.profile.as_ref())
    }

    /// Drops everything known about a connection
    ///
    /// Returns false when the connection had no record, which is not an error.
    pub fn remove(&mut self, connection: ConnectionId) -> bool {
        self.connections.remove(&connection).is_some()
    }

    /// Forgets every connection; all clients must register again
    pub fn clear(&mut self) {
        self.connections.clear();
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserProfile {
        UserProfile {
            display_name: "Alice".to_string(),
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("mobile".parse::<Role>(), Ok(Role::Submitter));
        assert_eq!("screen".parse::<Role>(), Ok(Role::Display));
        assert_eq!(
            "tablet".parse::<Role>(),
            Err(UnknownClientType("tablet".to_string()))
        );
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ConnectionRegistry::new();

        assert_eq!(registry.register(1, "mobile"), Some(Role::Submitter));
        assert_eq!(registry.register(2, "screen"), Some(Role::Display));

        assert_eq!(registry.lookup(1), Some(Role::Submitter));
        assert_eq!(registry.lookup(2), Some(Role::Display));
        assert_eq!(registry.lookup(3), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_unknown_type_is_noop() {
        let mut registry = ConnectionRegistry::new();

        assert_eq!(registry.register(1, "projector"), None);
        assert!(registry.is_empty());

        registry.register(1, "screen");
        assert_eq!(registry.register(1, ""), None);
        assert_eq!(registry.lookup(1), Some(Role::Display));
    }

    #[test]
    fn test_reregistration_overwrites_role_and_keeps_profile() {
        let mut registry = ConnectionRegistry::new();

        registry.register(1, "mobile");
        registry.attach_profile(1, alice());
        registry.register(1, "screen");

        assert_eq!(registry.lookup(1), Some(Role::Display));
        assert_eq!(registry.profile(1), Some(&alice()));
    }

    #[test]
    fn test_attach_profile_without_registration() {
        let mut registry = ConnectionRegistry::new();

        registry.attach_profile(7, alice());

        assert_eq!(registry.lookup(7), None);
        assert_eq!(registry.profile(7).map(|p| p.display_name.as_str()), Some("Alice"));
    }

    #[test]
    fn test_attach_profile_overwrites() {
        let mut registry = ConnectionRegistry::new();

        registry.attach_profile(1, alice());
        registry.attach_profile(
            1,
            UserProfile {
                display_name: "Alicia".to_string(),
            },
        );

        assert_eq!(registry.profile(1).unwrap().display_name, "Alicia");
    }

    #[test]
    fn test_remove_connection() {
        let mut registry = ConnectionRegistry::new();

        registry.register(1, "mobile");
        registry.attach_profile(1, alice());

        assert!(registry.remove(1));
        assert_eq!(registry.lookup(1), None);
        assert_eq!(registry.profile(1), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_connection() {
        let mut registry = ConnectionRegistry::new();
        assert!(!registry.remove(999));
        assert!(!registry.remove(999));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut registry = ConnectionRegistry::new();

        registry.register(1, "mobile");
        registry.register(2, "screen");
        registry.attach_profile(1, alice());
        registry.clear();

        assert!(registry.is_empty());
        assert_eq!(registry.lookup(2), None);
        assert_eq!(registry.profile(1), None);
    }
}
