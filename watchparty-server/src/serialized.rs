//! All schemas that are exposed from endpoints are defined here
//! along with the [ToSerialized] impls

use serde::Serialize;
use utoipa::ToSchema;
use watchparty_collab::{
    JoinRequestData, PartyData, PartyMemberData, PartyMessageData, PlaybackState as CollabPlaybackState,
    UserData,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    id: i32,
    username: String,
    display_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Party {
    id: i32,
    name: String,
    visibility: String,
    video_url: String,
    video_id: String,
    admin_id: i32,
    is_active: bool,
    created_at: String,
    members: Vec<PartyMember>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PartyMember {
    id: i32,
    user: User,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JoinRequest {
    id: i32,
    party_id: i32,
    user: User,
    status: String,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatMessage {
    id: i32,
    party_id: i32,
    author: User,
    content: String,
    created_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlaybackState {
    pub position: f32,
    pub is_playing: bool,
    #[schema(value_type = Option<Object>)]
    pub player_state: Option<serde_json::Value>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

impl ToSerialized<Party> for PartyData {
    fn to_serialized(&self) -> Party {
        Party {
            id: self.id,
            name: self.name.clone(),
            visibility: self.visibility.as_str().to_string(),
            video_url: self.video_url.clone(),
            video_id: self.video_id.clone(),
            admin_id: self.admin_id,
            is_active: self.is_active,
            created_at: self.created_at.to_rfc3339(),
            members: self.members.to_serialized(),
        }
    }
}

impl ToSerialized<PartyMember> for PartyMemberData {
    fn to_serialized(&self) -> PartyMember {
        PartyMember {
            id: self.id,
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<JoinRequest> for JoinRequestData {
    fn to_serialized(&self) -> JoinRequest {
        JoinRequest {
            id: self.id,
            party_id: self.party_id,
            user: self.user.to_serialized(),
            status: self.status.as_str().to_string(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

impl ToSerialized<ChatMessage> for PartyMessageData {
    fn to_serialized(&self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            party_id: self.party_id,
            author: self.author.to_serialized(),
            content: self.content.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl ToSerialized<PlaybackState> for CollabPlaybackState {
    fn to_serialized(&self) -> PlaybackState {
        PlaybackState {
            position: self.position,
            is_playing: self.is_playing,
            player_state: self.player_state.clone(),
        }
    }
}
