use async_trait::async_trait;
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound {
                resource: _,
                identifier: _
            }
        )
    }
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Represents a type that can fetch and store watchparty data
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn session_by_token(&self, token: &str) -> Result<SessionData>;

    async fn party_by_id(&self, party_id: PrimaryKey) -> Result<PartyData>;
    async fn list_parties(&self) -> Result<Vec<PartyData>>;
    async fn create_party(&self, new_party: NewParty) -> Result<PartyData>;
    async fn set_party_admin(&self, party_id: PrimaryKey, user_id: PrimaryKey) -> Result<()>;
    async fn set_party_active(&self, party_id: PrimaryKey, is_active: bool) -> Result<()>;
    /// Deletes the party row and its membership rows. Messages and join
    /// requests are cascaded explicitly by the caller beforehand.
    async fn delete_party(&self, party_id: PrimaryKey) -> Result<()>;

    async fn create_party_member(&self, new_member: NewPartyMember) -> Result<PartyMemberData>;
    async fn delete_party_member(&self, party_id: PrimaryKey, user_id: PrimaryKey) -> Result<()>;

    async fn join_request_by_id(&self, request_id: PrimaryKey) -> Result<JoinRequestData>;
    /// The pending request for a (party, user) pair, if one exists
    async fn pending_join_request(
        &self,
        party_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<JoinRequestData>;
    async fn list_pending_join_requests(
        &self,
        party_id: PrimaryKey,
    ) -> Result<Vec<JoinRequestData>>;
    async fn create_join_request(&self, new_request: NewJoinRequest) -> Result<JoinRequestData>;
    async fn set_join_request_status(
        &self,
        request_id: PrimaryKey,
        status: JoinRequestStatus,
    ) -> Result<JoinRequestData>;
    async fn delete_join_requests_by_party(&self, party_id: PrimaryKey) -> Result<()>;

    async fn create_party_message(
        &self,
        new_message: NewPartyMessage,
    ) -> Result<PartyMessageData>;
    /// The most recent `limit` messages of a party, newest first
    async fn list_party_messages(
        &self,
        party_id: PrimaryKey,
        limit: i64,
    ) -> Result<Vec<PartyMessageData>>;
    async fn delete_party_messages_by_party(&self, party_id: PrimaryKey) -> Result<()>;
}

#[derive(Debug)]
pub struct NewParty {
    pub name: String,
    pub visibility: PartyVisibility,
    pub video_url: String,
    pub video_id: String,
    /// The admin and first member of the new party
    pub user_id: PrimaryKey,
}

#[derive(Debug)]
pub struct NewPartyMember {
    pub party_id: PrimaryKey,
    pub user_id: PrimaryKey,
}

#[derive(Debug)]
pub struct NewJoinRequest {
    pub party_id: PrimaryKey,
    pub user_id: PrimaryKey,
}

#[derive(Debug)]
pub struct NewPartyMessage {
    pub party_id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub content: String,
}
