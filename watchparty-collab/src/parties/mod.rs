mod party;

use std::sync::Arc;

use thiserror::Error;

use crate::{video, CollabContext, Database, DatabaseError, NewParty, PartyVisibility, PrimaryKey};

pub use party::*;

/// Coordinates the in-memory party handles, which mirror the database and
/// are the single entry point for every party operation.
pub struct PartyManager<Db> {
    context: CollabContext<Db>,
}

/// What a user is allowed to do in a party
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    /// Full control: kicking, deleting, join requests, direct adds
    Admin,
    /// Chatting and leaving
    Member,
}

/// The verdict on a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRequestDecision {
    Approve,
    Reject,
}

#[derive(Debug, Error)]
pub enum PartyError {
    #[error("Party name must be between 3 and 100 characters")]
    InvalidName,
    #[error("Not a recognized video URL")]
    InvalidVideoUrl,
    #[error("Party is no longer active")]
    PartyInactive,
    #[error("User is not a member of this party")]
    NotAMember,
    #[error("User is already a member of this party")]
    AlreadyMember,
    #[error("Only the party admin can do this")]
    AdminRequired,
    #[error("This is a private party, membership must be requested")]
    PrivateParty,
    #[error("The admin cannot target themselves")]
    CannotTargetSelf,
    #[error("Join request does not belong to this party")]
    RequestNotFound,
    #[error("Join request was already resolved")]
    RequestAlreadyResolved,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Reaction is empty")]
    EmptyReaction,
    #[error("Message exceeds 500 characters")]
    MessageTooLong,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Everything needed to create a party
#[derive(Debug)]
pub struct NewPartyParams {
    pub name: String,
    pub visibility: PartyVisibility,
    pub video_url: String,
    /// The creator, who becomes sole member and admin
    pub user_id: PrimaryKey,
}

impl<Db> PartyManager<Db>
where
    Db: Database,
{
    pub fn new(context: &CollabContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Restores the parties from the database on init
    pub async fn restore(&self) -> Result<(), DatabaseError> {
        let parties: Vec<_> = self
            .context
            .database
            .list_parties()
            .await?
            .into_iter()
            .map(|p| (p.id, Party::new(&self.context, p)))
            .collect();

        for (id, party) in parties {
            self.context.parties.insert(id, party.into());
        }

        Ok(())
    }

    /// Creates a new party with the creator as sole member and admin
    pub async fn create_party(
        &self,
        params: NewPartyParams,
    ) -> Result<Arc<Party<Db>>, PartyError> {
        let name = params.name.trim().to_string();
        let name_length = name.chars().count();

        if name_length < 3 || name_length > 100 {
            return Err(PartyError::InvalidName);
        }

        let video_id =
            video::extract_video_id(&params.video_url).ok_or(PartyError::InvalidVideoUrl)?;

        let data = self
            .context
            .database
            .create_party(NewParty {
                name,
                visibility: params.visibility,
                video_url: params.video_url,
                video_id,
                user_id: params.user_id,
            })
            .await?;

        let party = Arc::new(Party::new(&self.context, data));
        self.context.parties.insert(party.id(), party.clone());

        Ok(party)
    }

    /// Returns the party if it exists
    pub fn party_by_id(&self, party_id: PartyId) -> Result<Arc<Party<Db>>, PartyError> {
        self.context
            .parties
            .get(&party_id)
            .map(|p| p.clone())
            .ok_or(PartyError::Database(DatabaseError::NotFound {
                resource: "party",
                identifier: "id",
            }))
    }

    /// All active parties
    pub fn list_active(&self) -> Vec<Arc<Party<Db>>> {
        self.context
            .parties
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.clone())
            .collect()
    }

    /// All active parties the user is a member of
    pub fn list_for_user(&self, user_id: PrimaryKey) -> Vec<Arc<Party<Db>>> {
        self.context
            .parties
            .iter()
            .filter(|p| p.is_active() && p.has_member(user_id))
            .map(|p| p.clone())
            .collect()
    }

    /// All parties in memory, inactive ones included
    pub fn list_all(&self) -> Vec<Arc<Party<Db>>> {
        self.context.parties.iter().map(|p| p.clone()).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Collab, JoinRequestStatus, MemoryDatabase, UserData};

    const VIDEO_URL: &str = "https://www.youtube.com/shorts/aBcDeFgHiJk";

    /// A collab over a memory database with three seeded users
    fn setup() -> (Collab<MemoryDatabase>, UserData, UserData, UserData) {
        let database = MemoryDatabase::new();

        let alice = database.add_user("alice", "Alice");
        let bob = database.add_user("bob", "Bob");
        let carol = database.add_user("carol", "Carol");

        (Collab::new(database), alice, bob, carol)
    }

    async fn create_party(
        collab: &Collab<MemoryDatabase>,
        visibility: PartyVisibility,
        user_id: PrimaryKey,
    ) -> Arc<Party<MemoryDatabase>> {
        collab
            .parties
            .create_party(NewPartyParams {
                name: "Movie Night".to_string(),
                visibility,
                video_url: VIDEO_URL.to_string(),
                user_id,
            })
            .await
            .expect("party is created")
    }

    fn assert_admin_is_member(party: &Party<MemoryDatabase>) {
        let data = party.data();
        assert!(
            data.members.iter().any(|m| m.user.id == data.admin_id),
            "admin must be a member"
        );
    }

    #[tokio::test]
    async fn test_create_party() {
        let (collab, alice, ..) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        let data = party.data();
        assert_eq!(data.admin_id, alice.id);
        assert_eq!(data.members.len(), 1);
        assert_eq!(data.video_id, "aBcDeFgHiJk");
        assert!(data.is_active);
        assert_admin_is_member(&party);
    }

    #[tokio::test]
    async fn test_create_party_validation() {
        let (collab, alice, ..) = setup();

        let too_short = collab
            .parties
            .create_party(NewPartyParams {
                name: "ab".to_string(),
                visibility: PartyVisibility::Public,
                video_url: VIDEO_URL.to_string(),
                user_id: alice.id,
            })
            .await;

        assert!(matches!(too_short, Err(PartyError::InvalidName)));

        let bad_url = collab
            .parties
            .create_party(NewPartyParams {
                name: "Movie Night".to_string(),
                visibility: PartyVisibility::Public,
                video_url: "https://example.com/watch?v=dQw4w9WgXcQ".to_string(),
                user_id: alice.id,
            })
            .await;

        assert!(matches!(bad_url, Err(PartyError::InvalidVideoUrl)));
    }

    #[tokio::test]
    async fn test_party_name_bounds_count_characters() {
        let (collab, alice, ..) = setup();

        // 40 characters but far more than 100 bytes
        let multibyte = collab
            .parties
            .create_party(NewPartyParams {
                name: "映".repeat(40),
                visibility: PartyVisibility::Public,
                video_url: VIDEO_URL.to_string(),
                user_id: alice.id,
            })
            .await;

        assert!(multibyte.is_ok());

        let too_long = collab
            .parties
            .create_party(NewPartyParams {
                name: "映".repeat(101),
                visibility: PartyVisibility::Public,
                video_url: VIDEO_URL.to_string(),
                user_id: alice.id,
            })
            .await;

        assert!(matches!(too_long, Err(PartyError::InvalidName)));
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        party.join(bob.id).await.expect("first join succeeds");
        party.join(bob.id).await.expect("second join succeeds");

        assert_eq!(party.data().members.len(), 2);
    }

    #[tokio::test]
    async fn test_private_party_refuses_direct_join() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Private, alice.id).await;

        let result = party.join(bob.id).await;
        assert!(matches!(result, Err(PartyError::PrivateParty)));

        // The route layer files a request after the refusal
        let request = party.request_join(bob.id).await.expect("request is filed");
        assert_eq!(request.status, JoinRequestStatus::Pending);

        let pending = party
            .pending_requests(alice.id)
            .await
            .expect("admin can list");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user.id, bob.id);
    }

    #[tokio::test]
    async fn test_duplicate_pending_requests_collapse() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Private, alice.id).await;

        let first = party.request_join(bob.id).await.expect("request is filed");
        let second = party.request_join(bob.id).await.expect("request is filed");

        assert_eq!(first.id, second.id);
        assert_eq!(party.pending_requests(alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_leave_transfers_admin() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        party.join(bob.id).await.unwrap();
        party.leave(alice.id).await.expect("admin can leave");

        let data = party.data();
        assert_eq!(data.admin_id, bob.id);
        assert!(data.is_active);
        assert_eq!(data.members.len(), 1);
        assert!(!data.members.iter().any(|m| m.user.id == alice.id));
        assert_admin_is_member(&party);
    }

    #[tokio::test]
    async fn test_last_member_leaving_deactivates() {
        let (collab, alice, ..) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        party.leave(alice.id).await.expect("last member can leave");

        let data = party.data();
        assert!(!data.is_active);
        // Soft delete: the record and its membership survive
        assert_eq!(data.members.len(), 1);
    }

    #[tokio::test]
    async fn test_leave_requires_membership() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        let result = party.leave(bob.id).await;
        assert!(matches!(result, Err(PartyError::NotAMember)));
    }

    #[tokio::test]
    async fn test_kick_authorization() {
        let (collab, alice, bob, carol) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        party.join(bob.id).await.unwrap();
        party.join(carol.id).await.unwrap();

        let by_non_admin = party.kick(bob.id, carol.id).await;
        assert!(matches!(by_non_admin, Err(PartyError::AdminRequired)));

        let self_kick = party.kick(alice.id, alice.id).await;
        assert!(matches!(self_kick, Err(PartyError::CannotTargetSelf)));

        party.kick(alice.id, bob.id).await.expect("admin can kick");
        assert!(!party.has_member(bob.id));

        let again = party.kick(alice.id, bob.id).await;
        assert!(matches!(again, Err(PartyError::NotAMember)));
    }

    #[tokio::test]
    async fn test_add_member_directly() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Private, alice.id).await;

        let by_non_admin = party.add_member(bob.id, bob.id).await;
        assert!(matches!(by_non_admin, Err(PartyError::NotAMember)));

        party
            .add_member(alice.id, bob.id)
            .await
            .expect("admin can add directly");

        let duplicate = party.add_member(alice.id, bob.id).await;
        assert!(matches!(duplicate, Err(PartyError::AlreadyMember)));
    }

    #[tokio::test]
    async fn test_resolve_request_is_terminal() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Private, alice.id).await;

        let request = party.request_join(bob.id).await.unwrap();

        let resolved = party
            .resolve_request(request.id, alice.id, JoinRequestDecision::Approve)
            .await
            .expect("admin can approve");

        assert_eq!(resolved.status, JoinRequestStatus::Approved);
        assert!(party.has_member(bob.id));

        let again = party
            .resolve_request(request.id, alice.id, JoinRequestDecision::Reject)
            .await;

        assert!(matches!(again, Err(PartyError::RequestAlreadyResolved)));
    }

    #[tokio::test]
    async fn test_reject_request_has_no_membership_effect() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Private, alice.id).await;

        let request = party.request_join(bob.id).await.unwrap();

        let resolved = party
            .resolve_request(request.id, alice.id, JoinRequestDecision::Reject)
            .await
            .expect("admin can reject");

        assert_eq!(resolved.status, JoinRequestStatus::Rejected);
        assert!(!party.has_member(bob.id));
    }

    #[tokio::test]
    async fn test_resolve_request_from_another_party() {
        let (collab, alice, bob, _) = setup();
        let first = create_party(&collab, PartyVisibility::Private, alice.id).await;
        let second = create_party(&collab, PartyVisibility::Private, alice.id).await;

        let request = first.request_join(bob.id).await.unwrap();

        let result = second
            .resolve_request(request.id, alice.id, JoinRequestDecision::Approve)
            .await;

        assert!(matches!(result, Err(PartyError::RequestNotFound)));
    }

    #[tokio::test]
    async fn test_message_bounds() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        let by_outsider = party.send_message(bob.id, "hello").await;
        assert!(matches!(by_outsider, Err(PartyError::NotAMember)));

        let empty = party.send_message(alice.id, "   ").await;
        assert!(matches!(empty, Err(PartyError::EmptyMessage)));

        let too_long = party.send_message(alice.id, &"x".repeat(501)).await;
        assert!(matches!(too_long, Err(PartyError::MessageTooLong)));

        let at_limit = party.send_message(alice.id, &"x".repeat(500)).await;
        assert!(at_limit.is_ok());
    }

    #[tokio::test]
    async fn test_message_history_is_chronological_and_bounded() {
        let (collab, alice, ..) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        for n in 0..120 {
            party
                .send_message(alice.id, &format!("message {n}"))
                .await
                .unwrap();
        }

        let history = party.message_history(alice.id).await.unwrap();

        assert_eq!(history.len(), 100);
        assert_eq!(history[0].content, "message 20");
        assert_eq!(history[99].content, "message 119");
    }

    #[tokio::test]
    async fn test_reaction_relay() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        let by_outsider = party.send_reaction(bob.id, "🔥");
        assert!(matches!(by_outsider, Err(PartyError::NotAMember)));

        let empty = party.send_reaction(alice.id, "   ");
        assert!(matches!(empty, Err(PartyError::EmptyReaction)));

        party
            .send_reaction(alice.id, "🔥")
            .expect("member can react");

        let event = collab.wait_for_event();
        assert!(matches!(event, crate::CollabEvent::Reaction { .. }));
        assert_eq!(event.party_id(), party.id());
        // Reactions go to the whole room, sender included
        assert_eq!(event.excluded_user(), None);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (collab, alice, bob, carol) = setup();
        let party = create_party(&collab, PartyVisibility::Private, alice.id).await;
        let party_id = party.id();

        party.add_member(alice.id, bob.id).await.unwrap();
        party.send_message(alice.id, "first").await.unwrap();
        party.send_message(bob.id, "second").await.unwrap();
        party.request_join(carol.id).await.unwrap();

        let by_non_admin = party.delete(bob.id).await;
        assert!(matches!(by_non_admin, Err(PartyError::AdminRequired)));

        party.delete(alice.id).await.expect("admin can delete");

        assert!(collab.parties.party_by_id(party_id).is_err());

        let database = collab.database();
        assert!(database.party_by_id(party_id).await.is_err());
        assert!(database
            .list_party_messages(party_id, 100)
            .await
            .unwrap()
            .is_empty());
        assert!(database
            .list_pending_join_requests(party_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_join_inactive_party() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        party.leave(alice.id).await.unwrap();

        let result = party.join(bob.id).await;
        assert!(matches!(result, Err(PartyError::PartyInactive)));
    }

    #[tokio::test]
    async fn test_restore() {
        let (collab, alice, bob, _) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        party.join(bob.id).await.unwrap();

        // A second collab over the same database sees the same parties
        let restored = Collab::attach(collab.database());
        restored.init().await.expect("restore succeeds");

        let party = restored.parties.party_by_id(party.id()).expect("party exists");
        assert_eq!(party.data().members.len(), 2);
    }

    #[tokio::test]
    async fn test_playback_relay_events() {
        let (collab, alice, ..) = setup();
        let party = create_party(&collab, PartyVisibility::Public, alice.id).await;

        party.report_playback(
            alice.id,
            crate::PlaybackState {
                position: 42.5,
                is_playing: true,
                player_state: None,
            },
        );

        let event = collab.wait_for_event();
        assert_eq!(event.excluded_user(), Some(alice.id));
        assert_eq!(event.party_id(), party.id());
    }
}
