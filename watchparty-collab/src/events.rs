use crossbeam::channel::{Receiver, Sender};

use crate::{PartyMemberData, PartyMessageData, PrimaryKey};

pub type EventSender = Sender<CollabEvent>;
pub type EventReceiver = Receiver<CollabEvent>;

/// A participant's self-reported playback cursor. Relayed verbatim to the
/// rest of the party's session and never stored; receivers apply the most
/// recently delivered report at their own discretion.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    /// Position in seconds, as reported by the participant's player
    pub position: f32,
    pub is_playing: bool,
    /// Raw embedded-player state code, if the client reports one
    pub player_state: Option<serde_json::Value>,
}

/// Events emitted by the collab system. Every event is scoped to a party's
/// live session room. Delivery is at most once with no durability: whoever
/// is connected to the room when the event fires receives it, nobody else.
#[derive(Debug, Clone)]
pub enum CollabEvent {
    /// A user became a member of a party
    UserJoined {
        party_id: PrimaryKey,
        new_member: PartyMemberData,
    },
    /// A user left a party. Carries the new admin when the departure
    /// transferred adminship.
    UserLeft {
        party_id: PrimaryKey,
        user_id: PrimaryKey,
        new_admin_id: Option<PrimaryKey>,
    },
    /// A member was removed by the admin
    UserKicked {
        party_id: PrimaryKey,
        user_id: PrimaryKey,
        kicked_by: PrimaryKey,
    },
    /// The party was deleted by its admin. Emitted before the cascade runs,
    /// so this is an advisory notice, not a commit confirmation.
    PartyDeleted {
        party_id: PrimaryKey,
        deleted_by: PrimaryKey,
    },
    /// A chat message was persisted
    ChatMessage {
        party_id: PrimaryKey,
        message: PartyMessageData,
    },
    /// A member sent an emoji reaction. Ephemeral, never stored, and
    /// delivered to the whole room, sender included.
    Reaction {
        party_id: PrimaryKey,
        user_id: PrimaryKey,
        emoji: String,
    },
    /// A participant reported its playback cursor. Not delivered back to
    /// the reporter.
    PlaybackUpdate {
        party_id: PrimaryKey,
        reporter_id: PrimaryKey,
        state: PlaybackState,
    },
    /// A participant asked whoever is driving playback to re-report its
    /// state. Purely advisory, nobody is required to answer.
    SyncRequested {
        party_id: PrimaryKey,
        requester_id: PrimaryKey,
    },
    /// A user entered the party's live session room
    SessionJoined {
        party_id: PrimaryKey,
        user_id: PrimaryKey,
    },
    /// A user left the party's live session room
    SessionLeft {
        party_id: PrimaryKey,
        user_id: PrimaryKey,
    },
}

impl CollabEvent {
    /// The party room this event fans out to
    pub fn party_id(&self) -> PrimaryKey {
        match self {
            Self::UserJoined { party_id, .. }
            | Self::UserLeft { party_id, .. }
            | Self::UserKicked { party_id, .. }
            | Self::PartyDeleted { party_id, .. }
            | Self::ChatMessage { party_id, .. }
            | Self::Reaction { party_id, .. }
            | Self::PlaybackUpdate { party_id, .. }
            | Self::SyncRequested { party_id, .. }
            | Self::SessionJoined { party_id, .. }
            | Self::SessionLeft { party_id, .. } => *party_id,
        }
    }

    /// The user this event must not be delivered to, if any
    pub fn excluded_user(&self) -> Option<PrimaryKey> {
        match self {
            Self::PlaybackUpdate { reporter_id, .. } => Some(*reporter_id),
            Self::SessionJoined { user_id, .. } | Self::SessionLeft { user_id, .. } => {
                Some(*user_id)
            }
            _ => None,
        }
    }
}
