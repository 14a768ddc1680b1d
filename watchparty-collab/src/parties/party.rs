use log::info;
use parking_lot::Mutex;

use crate::{
    events::CollabEvent, CollabContext, Database, JoinRequestData, JoinRequestStatus,
    NewJoinRequest, NewPartyMember, NewPartyMessage, PartyData, PartyMemberData, PartyMessageData,
    PartyVisibility, PlaybackState, PrimaryKey,
};

use super::{JoinRequestDecision, PartyError, PartyRole};

pub type PartyId = PrimaryKey;

/// A watchparty party, wrapping its database record with every operation
/// that can be performed on it. All mutations write through to the database
/// and keep the in-memory copy in step, then notify the live session room.
pub struct Party<Db> {
    context: CollabContext<Db>,
    data: Mutex<PartyData>,
}

impl<Db> Party<Db>
where
    Db: Database,
{
    /// One bound for every path a message can take
    pub const MAX_MESSAGE_LENGTH: usize = 500;
    /// How far back a history fetch reaches
    pub const MESSAGE_HISTORY_LIMIT: i64 = 100;

    pub fn new(context: &CollabContext<Db>, data: PartyData) -> Self {
        Self {
            context: context.clone(),
            data: data.into(),
        }
    }

    pub fn data(&self) -> PartyData {
        self.data.lock().clone()
    }

    pub fn id(&self) -> PartyId {
        self.data.lock().id
    }

    pub fn is_active(&self) -> bool {
        self.data.lock().is_active
    }

    pub fn has_member(&self, user_id: PrimaryKey) -> bool {
        self.data
            .lock()
            .members
            .iter()
            .any(|m| m.user.id == user_id)
    }

    /// The authorization guard. Every member- or admin-gated operation goes
    /// through here exactly once, so the rules cannot drift between
    /// operations.
    pub fn authorize(&self, user_id: PrimaryKey) -> Result<PartyRole, PartyError> {
        let data = self.data.lock();

        let is_member = data.members.iter().any(|m| m.user.id == user_id);

        if !is_member {
            return Err(PartyError::NotAMember);
        }

        if data.admin_id == user_id {
            Ok(PartyRole::Admin)
        } else {
            Ok(PartyRole::Member)
        }
    }

    fn authorize_admin(&self, user_id: PrimaryKey) -> Result<(), PartyError> {
        match self.authorize(user_id)? {
            PartyRole::Admin => Ok(()),
            PartyRole::Member => Err(PartyError::AdminRequired),
        }
    }

    /// Joins the party directly. Idempotent for existing members. Private
    /// parties refuse direct joins from anyone but the admin; the caller is
    /// expected to file a join request instead.
    pub async fn join(&self, user_id: PrimaryKey) -> Result<(), PartyError> {
        if self.has_member(user_id) {
            return Ok(());
        }

        let (is_active, visibility, admin_id) = {
            let data = self.data.lock();
            (data.is_active, data.visibility, data.admin_id)
        };

        if !is_active {
            return Err(PartyError::PartyInactive);
        }

        if visibility == PartyVisibility::Private && user_id != admin_id {
            return Err(PartyError::PrivateParty);
        }

        self.insert_member(user_id).await?;
        Ok(())
    }

    /// Adds the user as a member, skipping visibility checks. Used by the
    /// public join path, approvals, and the admin direct-add path.
    async fn insert_member(&self, user_id: PrimaryKey) -> Result<PartyMemberData, PartyError> {
        let member = self
            .context
            .database
            .create_party_member(NewPartyMember {
                party_id: self.id(),
                user_id,
            })
            .await?;

        self.data.lock().members.push(member.clone());

        info!(
            "{} joined party {}",
            member.user.username,
            self.data().name
        );

        self.context.emit(CollabEvent::UserJoined {
            party_id: self.id(),
            new_member: member.clone(),
        });

        Ok(member)
    }

    /// Leaves the party. An admin leaving hands adminship to the first
    /// remaining member in stored order, an arbitrary choice callers must
    /// not rely on. The last member leaving deactivates the party instead
    /// of removing anything.
    pub async fn leave(&self, user_id: PrimaryKey) -> Result<(), PartyError> {
        self.authorize(user_id)?;

        let (member_count, is_admin, successor) = {
            let data = self.data.lock();

            let successor = data
                .members
                .iter()
                .find(|m| m.user.id != user_id)
                .map(|m| m.user.id);

            (data.members.len(), data.admin_id == user_id, successor)
        };

        if member_count <= 1 {
            // Soft delete. The record and its last membership row survive.
            self.context
                .database
                .set_party_active(self.id(), false)
                .await?;

            self.data.lock().is_active = false;

            info!("Party {} is now inactive", self.data().name);

            self.context.emit(CollabEvent::UserLeft {
                party_id: self.id(),
                user_id,
                new_admin_id: None,
            });

            return Ok(());
        }

        // Transfer adminship before removing the member, so the admin is a
        // member at every observable point.
        let new_admin_id = match (is_admin, successor) {
            (true, Some(next)) => {
                self.context.database.set_party_admin(self.id(), next).await?;
                self.data.lock().admin_id = next;
                Some(next)
            }
            _ => None,
        };

        self.context
            .database
            .delete_party_member(self.id(), user_id)
            .await?;

        self.data.lock().members.retain(|m| m.user.id != user_id);

        self.context.emit(CollabEvent::UserLeft {
            party_id: self.id(),
            user_id,
            new_admin_id,
        });

        Ok(())
    }

    /// Removes a member. Admin only, and the admin cannot kick themselves.
    pub async fn kick(
        &self,
        acting_user_id: PrimaryKey,
        target_user_id: PrimaryKey,
    ) -> Result<(), PartyError> {
        self.authorize_admin(acting_user_id)?;

        if acting_user_id == target_user_id {
            return Err(PartyError::CannotTargetSelf);
        }

        if !self.has_member(target_user_id) {
            return Err(PartyError::NotAMember);
        }

        self.context
            .database
            .delete_party_member(self.id(), target_user_id)
            .await?;

        self.data
            .lock()
            .members
            .retain(|m| m.user.id != target_user_id);

        self.context.emit(CollabEvent::UserKicked {
            party_id: self.id(),
            user_id: target_user_id,
            kicked_by: acting_user_id,
        });

        Ok(())
    }

    /// Adds a member directly, bypassing the join and request flows.
    /// Admin only.
    pub async fn add_member(
        &self,
        acting_user_id: PrimaryKey,
        target_user_id: PrimaryKey,
    ) -> Result<PartyMemberData, PartyError> {
        self.authorize_admin(acting_user_id)?;

        if self.has_member(target_user_id) {
            return Err(PartyError::AlreadyMember);
        }

        // Surface a user-not-found before touching membership
        let _ = self.context.database.user_by_id(target_user_id).await?;

        self.insert_member(target_user_id).await
    }

    /// Deletes the party and everything belonging to it. Admin only.
    ///
    /// The deletion notice goes out before the cascade runs, so connected
    /// participants learn about it while they can still receive it. A
    /// persistence failure after that point leaves them informed of a
    /// deletion that did not complete; the notice is advisory, not a commit
    /// confirmation.
    pub async fn delete(&self, acting_user_id: PrimaryKey) -> Result<(), PartyError> {
        self.authorize_admin(acting_user_id)?;

        let id = self.id();

        self.context.emit(CollabEvent::PartyDeleted {
            party_id: id,
            deleted_by: acting_user_id,
        });

        self.context
            .database
            .delete_party_messages_by_party(id)
            .await?;

        self.context
            .database
            .delete_join_requests_by_party(id)
            .await?;

        self.context.database.delete_party(id).await?;

        self.context.sessions.clear_room(id);
        self.context.parties.remove(&id);

        info!("Party {} was deleted", self.data().name);

        Ok(())
    }

    /// Files a join request for a user. An existing pending request for the
    /// same user is returned as-is instead of piling up duplicates.
    pub async fn request_join(&self, user_id: PrimaryKey) -> Result<JoinRequestData, PartyError> {
        if !self.is_active() {
            return Err(PartyError::PartyInactive);
        }

        if self.has_member(user_id) {
            return Err(PartyError::AlreadyMember);
        }

        let existing = self
            .context
            .database
            .pending_join_request(self.id(), user_id)
            .await;

        match existing {
            Ok(request) => Ok(request),
            Err(e) if e.is_not_found() => Ok(self
                .context
                .database
                .create_join_request(NewJoinRequest {
                    party_id: self.id(),
                    user_id,
                })
                .await?),
            Err(e) => Err(e.into()),
        }
    }

    /// The pending join requests. Admin only.
    pub async fn pending_requests(
        &self,
        acting_user_id: PrimaryKey,
    ) -> Result<Vec<JoinRequestData>, PartyError> {
        self.authorize_admin(acting_user_id)?;

        Ok(self
            .context
            .database
            .list_pending_join_requests(self.id())
            .await?)
    }

    /// Approves or rejects a join request. Admin only, and terminal: a
    /// request that already left pending can never transition again.
    pub async fn resolve_request(
        &self,
        request_id: PrimaryKey,
        acting_user_id: PrimaryKey,
        decision: JoinRequestDecision,
    ) -> Result<JoinRequestData, PartyError> {
        self.authorize_admin(acting_user_id)?;

        let request = self.context.database.join_request_by_id(request_id).await?;

        if request.party_id != self.id() {
            return Err(PartyError::RequestNotFound);
        }

        if request.status != JoinRequestStatus::Pending {
            return Err(PartyError::RequestAlreadyResolved);
        }

        match decision {
            JoinRequestDecision::Approve => {
                let updated = self
                    .context
                    .database
                    .set_join_request_status(request_id, JoinRequestStatus::Approved)
                    .await?;

                if !self.has_member(request.user.id) {
                    self.insert_member(request.user.id).await?;
                }

                Ok(updated)
            }
            JoinRequestDecision::Reject => Ok(self
                .context
                .database
                .set_join_request_status(request_id, JoinRequestStatus::Rejected)
                .await?),
        }
    }

    /// Persists a chat message and relays it to the live session room.
    /// Members only. The trimmed text must be non-empty and at most
    /// [Self::MAX_MESSAGE_LENGTH] characters.
    pub async fn send_message(
        &self,
        user_id: PrimaryKey,
        text: &str,
    ) -> Result<PartyMessageData, PartyError> {
        self.authorize(user_id)?;

        let content = text.trim();

        if content.is_empty() {
            return Err(PartyError::EmptyMessage);
        }

        if content.chars().count() > Self::MAX_MESSAGE_LENGTH {
            return Err(PartyError::MessageTooLong);
        }

        let message = self
            .context
            .database
            .create_party_message(NewPartyMessage {
                party_id: self.id(),
                user_id,
                content: content.to_string(),
            })
            .await?;

        self.context.emit(CollabEvent::ChatMessage {
            party_id: self.id(),
            message: message.clone(),
        });

        Ok(message)
    }

    /// The most recent messages in chronological order. Members only.
    pub async fn message_history(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<PartyMessageData>, PartyError> {
        self.authorize(user_id)?;

        let mut messages = self
            .context
            .database
            .list_party_messages(self.id(), Self::MESSAGE_HISTORY_LIMIT)
            .await?;

        // The database hands them back newest first
        messages.reverse();

        Ok(messages)
    }

    /// Relays an emoji reaction to the live session room, the sender
    /// included. Members only, never stored.
    pub fn send_reaction(&self, user_id: PrimaryKey, emoji: &str) -> Result<(), PartyError> {
        self.authorize(user_id)?;

        let emoji = emoji.trim();

        if emoji.is_empty() {
            return Err(PartyError::EmptyReaction);
        }

        self.context.emit(CollabEvent::Reaction {
            party_id: self.id(),
            user_id,
            emoji: emoji.to_string(),
        });

        Ok(())
    }

    /// Relays a participant's reported playback cursor to everyone else in
    /// the room. Nothing is checked beyond the party existing, nothing is
    /// stored, and conflicting reports are not arbitrated; the last one
    /// delivered wins at each receiver.
    pub fn report_playback(&self, reporter_id: PrimaryKey, state: PlaybackState) {
        self.context.emit(CollabEvent::PlaybackUpdate {
            party_id: self.id(),
            reporter_id,
            state,
        });
    }

    /// Asks the room for a fresh playback report. Whoever is conventionally
    /// driving playback is expected to answer; nothing enforces that.
    pub fn request_sync(&self, requester_id: PrimaryKey) {
        self.context.emit(CollabEvent::SyncRequested {
            party_id: self.id(),
            requester_id,
        });
    }

    /// Enters the party's live session room
    pub fn join_session(&self, user_id: PrimaryKey) {
        self.context.sessions.join_room(self.id(), user_id);

        self.context.emit(CollabEvent::SessionJoined {
            party_id: self.id(),
            user_id,
        });
    }

    /// Leaves the party's live session room
    pub fn leave_session(&self, user_id: PrimaryKey) {
        self.context.sessions.leave_room(self.id(), user_id);

        self.context.emit(CollabEvent::SessionLeft {
            party_id: self.id(),
            user_id,
        });
    }
}
