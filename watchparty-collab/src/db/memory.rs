use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::{
    Database, DatabaseError, JoinRequestData, JoinRequestStatus, NewJoinRequest, NewParty,
    NewPartyMember, NewPartyMessage, PartyData, PartyMemberData, PartyMessageData, PartyVisibility,
    PrimaryKey, Result, SessionData, UserData,
};

/// An in-memory database implementation, used by tests and local development.
/// Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    next_id: PrimaryKey,
    users: Vec<UserData>,
    sessions: Vec<StoredSession>,
    parties: Vec<StoredParty>,
    members: Vec<StoredMember>,
    join_requests: Vec<StoredJoinRequest>,
    messages: Vec<StoredMessage>,
}

#[derive(Debug, Clone)]
struct StoredSession {
    id: PrimaryKey,
    token: String,
    expires_at: DateTime<Utc>,
    user_id: PrimaryKey,
}

#[derive(Debug, Clone)]
struct StoredParty {
    id: PrimaryKey,
    name: String,
    visibility: PartyVisibility,
    video_url: String,
    video_id: String,
    admin_id: PrimaryKey,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredMember {
    id: PrimaryKey,
    party_id: PrimaryKey,
    user_id: PrimaryKey,
}

#[derive(Debug, Clone)]
struct StoredJoinRequest {
    id: PrimaryKey,
    party_id: PrimaryKey,
    user_id: PrimaryKey,
    status: JoinRequestStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    id: PrimaryKey,
    party_id: PrimaryKey,
    user_id: PrimaryKey,
    content: String,
    created_at: DateTime<Utc>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Default::default()
    }

    /// Seeds a user, since account creation belongs to the external
    /// authentication system.
    pub fn add_user(&self, username: &str, display_name: &str) -> UserData {
        let mut state = self.state.lock();

        let user = UserData {
            id: state.allocate_id(),
            username: username.to_string(),
            display_name: display_name.to_string(),
        };

        state.users.push(user.clone());
        user
    }

    /// Seeds a session for a user, valid for a week.
    pub fn add_session(&self, token: &str, user_id: PrimaryKey) -> Result<SessionData> {
        let mut state = self.state.lock();
        let user = state.user(user_id)?;

        let session = StoredSession {
            id: state.allocate_id(),
            token: token.to_string(),
            expires_at: Utc::now() + Duration::days(7),
            user_id: user.id,
        };

        state.sessions.push(session.clone());

        Ok(SessionData {
            id: session.id,
            token: session.token,
            expires_at: session.expires_at,
            user,
        })
    }
}

impl State {
    fn allocate_id(&mut self) -> PrimaryKey {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    fn party(&self, party_id: PrimaryKey) -> Result<StoredParty> {
        self.parties
            .iter()
            .find(|p| p.id == party_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "party",
                identifier: "id",
            })
    }

    fn party_members(&self, party_id: PrimaryKey) -> Result<Vec<PartyMemberData>> {
        self.members
            .iter()
            .filter(|m| m.party_id == party_id)
            .map(|m| {
                Ok(PartyMemberData {
                    id: m.id,
                    user: self.user(m.user_id)?,
                })
            })
            .collect()
    }

    fn assemble_party(&self, stored: StoredParty) -> Result<PartyData> {
        let members = self.party_members(stored.id)?;

        Ok(PartyData {
            id: stored.id,
            name: stored.name,
            visibility: stored.visibility,
            video_url: stored.video_url,
            video_id: stored.video_id,
            admin_id: stored.admin_id,
            is_active: stored.is_active,
            created_at: stored.created_at,
            members,
        })
    }

    fn assemble_join_request(&self, stored: StoredJoinRequest) -> Result<JoinRequestData> {
        Ok(JoinRequestData {
            id: stored.id,
            party_id: stored.party_id,
            user: self.user(stored.user_id)?,
            status: stored.status,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.state.lock().user(user_id)
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let state = self.state.lock();

        let session = state
            .sessions
            .iter()
            .find(|s| s.token == token)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })?;

        Ok(SessionData {
            id: session.id,
            token: session.token,
            expires_at: session.expires_at,
            user: state.user(session.user_id)?,
        })
    }

    async fn party_by_id(&self, party_id: PrimaryKey) -> Result<PartyData> {
        let state = self.state.lock();
        let stored = state.party(party_id)?;

        state.assemble_party(stored)
    }

    async fn list_parties(&self) -> Result<Vec<PartyData>> {
        let state = self.state.lock();

        state
            .parties
            .iter()
            .cloned()
            .map(|p| state.assemble_party(p))
            .collect()
    }

    async fn create_party(&self, new_party: NewParty) -> Result<PartyData> {
        let mut state = self.state.lock();
        let user = state.user(new_party.user_id)?;

        let stored = StoredParty {
            id: state.allocate_id(),
            name: new_party.name,
            visibility: new_party.visibility,
            video_url: new_party.video_url,
            video_id: new_party.video_id,
            admin_id: user.id,
            is_active: true,
            created_at: Utc::now(),
        };

        let member = StoredMember {
            id: state.allocate_id(),
            party_id: stored.id,
            user_id: user.id,
        };

        state.parties.push(stored.clone());
        state.members.push(member);

        state.assemble_party(stored)
    }

    async fn set_party_admin(&self, party_id: PrimaryKey, user_id: PrimaryKey) -> Result<()> {
        let mut state = self.state.lock();
        let party = state
            .parties
            .iter_mut()
            .find(|p| p.id == party_id)
            .ok_or(DatabaseError::NotFound {
                resource: "party",
                identifier: "id",
            })?;

        party.admin_id = user_id;
        Ok(())
    }

    async fn set_party_active(&self, party_id: PrimaryKey, is_active: bool) -> Result<()> {
        let mut state = self.state.lock();
        let party = state
            .parties
            .iter_mut()
            .find(|p| p.id == party_id)
            .ok_or(DatabaseError::NotFound {
                resource: "party",
                identifier: "id",
            })?;

        party.is_active = is_active;
        Ok(())
    }

    async fn delete_party(&self, party_id: PrimaryKey) -> Result<()> {
        let mut state = self.state.lock();
        let _ = state.party(party_id)?;

        state.members.retain(|m| m.party_id != party_id);
        state.parties.retain(|p| p.id != party_id);
        Ok(())
    }

    async fn create_party_member(&self, new_member: NewPartyMember) -> Result<PartyMemberData> {
        let mut state = self.state.lock();
        let user = state.user(new_member.user_id)?;
        let _ = state.party(new_member.party_id)?;

        let exists = state
            .members
            .iter()
            .any(|m| m.party_id == new_member.party_id && m.user_id == new_member.user_id);

        if exists {
            return Err(DatabaseError::Conflict {
                resource: "party member",
                field: "party:user",
                value: format!("{}:{}", new_member.party_id, new_member.user_id),
            });
        }

        let stored = StoredMember {
            id: state.allocate_id(),
            party_id: new_member.party_id,
            user_id: new_member.user_id,
        };

        state.members.push(stored.clone());

        Ok(PartyMemberData {
            id: stored.id,
            user,
        })
    }

    async fn delete_party_member(&self, party_id: PrimaryKey, user_id: PrimaryKey) -> Result<()> {
        let mut state = self.state.lock();

        let exists = state
            .members
            .iter()
            .any(|m| m.party_id == party_id && m.user_id == user_id);

        if !exists {
            return Err(DatabaseError::NotFound {
                resource: "party member",
                identifier: "party_id:user_id",
            });
        }

        state
            .members
            .retain(|m| !(m.party_id == party_id && m.user_id == user_id));
        Ok(())
    }

    async fn join_request_by_id(&self, request_id: PrimaryKey) -> Result<JoinRequestData> {
        let state = self.state.lock();

        let stored = state
            .join_requests
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "join request",
                identifier: "id",
            })?;

        state.assemble_join_request(stored)
    }

    async fn pending_join_request(
        &self,
        party_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<JoinRequestData> {
        let state = self.state.lock();

        let stored = state
            .join_requests
            .iter()
            .find(|r| {
                r.party_id == party_id
                    && r.user_id == user_id
                    && r.status == JoinRequestStatus::Pending
            })
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "join request",
                identifier: "party_id:user_id",
            })?;

        state.assemble_join_request(stored)
    }

    async fn list_pending_join_requests(
        &self,
        party_id: PrimaryKey,
    ) -> Result<Vec<JoinRequestData>> {
        let state = self.state.lock();

        state
            .join_requests
            .iter()
            .filter(|r| r.party_id == party_id && r.status == JoinRequestStatus::Pending)
            .cloned()
            .map(|r| state.assemble_join_request(r))
            .collect()
    }

    async fn create_join_request(&self, new_request: NewJoinRequest) -> Result<JoinRequestData> {
        let mut state = self.state.lock();
        let _ = state.user(new_request.user_id)?;
        let _ = state.party(new_request.party_id)?;

        let now = Utc::now();
        let stored = StoredJoinRequest {
            id: state.allocate_id(),
            party_id: new_request.party_id,
            user_id: new_request.user_id,
            status: JoinRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        state.join_requests.push(stored.clone());
        state.assemble_join_request(stored)
    }

    async fn set_join_request_status(
        &self,
        request_id: PrimaryKey,
        status: JoinRequestStatus,
    ) -> Result<JoinRequestData> {
        let mut state = self.state.lock();

        let request = state
            .join_requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or(DatabaseError::NotFound {
                resource: "join request",
                identifier: "id",
            })?;

        request.status = status;
        request.updated_at = Utc::now();

        let stored = request.clone();
        state.assemble_join_request(stored)
    }

    async fn delete_join_requests_by_party(&self, party_id: PrimaryKey) -> Result<()> {
        self.state
            .lock()
            .join_requests
            .retain(|r| r.party_id != party_id);
        Ok(())
    }

    async fn create_party_message(
        &self,
        new_message: NewPartyMessage,
    ) -> Result<PartyMessageData> {
        let mut state = self.state.lock();
        let user = state.user(new_message.user_id)?;
        let _ = state.party(new_message.party_id)?;

        let stored = StoredMessage {
            id: state.allocate_id(),
            party_id: new_message.party_id,
            user_id: new_message.user_id,
            content: new_message.content,
            created_at: Utc::now(),
        };

        state.messages.push(stored.clone());

        Ok(PartyMessageData {
            id: stored.id,
            party_id: stored.party_id,
            author: user,
            content: stored.content,
            created_at: stored.created_at,
        })
    }

    async fn list_party_messages(
        &self,
        party_id: PrimaryKey,
        limit: i64,
    ) -> Result<Vec<PartyMessageData>> {
        let state = self.state.lock();

        // Newest first, like the postgres implementation
        let mut stored: Vec<_> = state
            .messages
            .iter()
            .filter(|m| m.party_id == party_id)
            .cloned()
            .collect();

        stored.reverse();
        stored.truncate(limit as usize);

        stored
            .into_iter()
            .map(|m| {
                Ok(PartyMessageData {
                    id: m.id,
                    party_id: m.party_id,
                    author: state.user(m.user_id)?,
                    content: m.content,
                    created_at: m.created_at,
                })
            })
            .collect()
    }

    async fn delete_party_messages_by_party(&self, party_id: PrimaryKey) -> Result<()> {
        self.state
            .lock()
            .messages
            .retain(|m| m.party_id != party_id);
        Ok(())
    }
}
