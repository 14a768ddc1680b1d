use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::{util::Id, PrimaryKey};

pub type GatewaySessionId = Id<GatewaySession>;

/// A single live connection belonging to a user. A user can hold several at
/// once, one per open client.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    pub id: GatewaySessionId,
    pub user_id: PrimaryKey,
}

/// The connected-session table: which users currently hold live connections,
/// and which party rooms they are in.
///
/// This registry is process-local and never persisted. Presence is lost on
/// restart and is not shared between worker processes, so broadcast coverage
/// is best effort within a single process. Room membership here is also
/// decoupled from verified party membership: a participant may still be in a
/// room moments after being removed from the party, and the reverse. Both
/// are accepted properties of the design, not bugs to compensate for.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<Vec<GatewaySession>>,
    rooms: Mutex<HashMap<PrimaryKey, HashSet<PrimaryKey>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a live connection for a user
    pub fn register(&self, user_id: PrimaryKey) -> GatewaySessionId {
        let session = GatewaySession {
            id: GatewaySessionId::new(),
            user_id,
        };

        let id = session.id;
        self.sessions.lock().push(session);
        id
    }

    /// Removes a connection. When it was the user's last one, the user also
    /// drops out of every room they were in.
    pub fn unregister(&self, id: GatewaySessionId) {
        let mut sessions = self.sessions.lock();

        let user_id = match sessions.iter().find(|s| s.id == id) {
            Some(session) => session.user_id,
            None => return,
        };

        sessions.retain(|s| s.id != id);

        let still_connected = sessions.iter().any(|s| s.user_id == user_id);

        if !still_connected {
            for users in self.rooms.lock().values_mut() {
                users.remove(&user_id);
            }
        }
    }

    /// Puts a user in a party's live session room
    pub fn join_room(&self, party_id: PrimaryKey, user_id: PrimaryKey) {
        self.rooms
            .lock()
            .entry(party_id)
            .or_default()
            .insert(user_id);
    }

    /// Takes a user out of a party's live session room
    pub fn leave_room(&self, party_id: PrimaryKey, user_id: PrimaryKey) {
        if let Some(users) = self.rooms.lock().get_mut(&party_id) {
            users.remove(&user_id);
        }
    }

    /// Drops a room entirely. Used when its party is deleted.
    pub fn clear_room(&self, party_id: PrimaryKey) {
        self.rooms.lock().remove(&party_id);
    }

    /// The users currently in a party's room
    pub fn users_in_room(&self, party_id: PrimaryKey) -> Vec<PrimaryKey> {
        self.rooms
            .lock()
            .get(&party_id)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_connected(&self, user_id: PrimaryKey) -> bool {
        self.sessions.lock().iter().any(|s| s.user_id == user_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_register_and_unregister() {
        let registry = SessionRegistry::new();

        let first = registry.register(1);
        let second = registry.register(1);

        assert!(registry.is_connected(1));

        registry.unregister(first);
        assert!(registry.is_connected(1));

        registry.unregister(second);
        assert!(!registry.is_connected(1));
    }

    #[test]
    fn test_room_membership() {
        let registry = SessionRegistry::new();

        registry.register(1);
        registry.register(2);

        registry.join_room(10, 1);
        registry.join_room(10, 2);

        let mut users = registry.users_in_room(10);
        users.sort();
        assert_eq!(users, vec![1, 2]);

        registry.leave_room(10, 1);
        assert_eq!(registry.users_in_room(10), vec![2]);
    }

    #[test]
    fn test_last_disconnect_leaves_rooms() {
        let registry = SessionRegistry::new();

        let session = registry.register(1);
        registry.join_room(10, 1);

        registry.unregister(session);
        assert!(registry.users_in_room(10).is_empty());
    }

    #[test]
    fn test_clear_room() {
        let registry = SessionRegistry::new();

        registry.register(1);
        registry.join_room(10, 1);
        registry.clear_room(10);

        assert!(registry.users_in_room(10).is_empty());
    }
}
