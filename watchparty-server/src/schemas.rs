//! All schemas accepted by endpoints are defined here

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use validator::Validate;
use watchparty_collab::PartyVisibility;

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum VisibilitySchema {
    Public,
    Private,
}

impl From<VisibilitySchema> for PartyVisibility {
    fn from(value: VisibilitySchema) -> Self {
        match value {
            VisibilitySchema::Public => Self::Public,
            VisibilitySchema::Private => Self::Private,
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPartySchema {
    #[validate(length(min = 3, max = 100))]
    pub name: String,
    pub visibility: VisibilitySchema,
    pub video_url: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewChatMessageSchema {
    #[validate(length(min = 1, max = 500))]
    pub message: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReactionSchema {
    #[validate(length(min = 1, max = 16))]
    pub emoji: String,
}

#[derive(Debug, ToSchema, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KickSchema {
    pub user_id: i32,
}

#[derive(Debug, ToSchema, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddMemberSchema {
    pub user_id: i32,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum JoinRequestActionSchema {
    Approve,
    Reject,
}

#[derive(Debug, ToSchema, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JoinRequestResolutionSchema {
    pub action: JoinRequestActionSchema,
}

#[derive(Debug, ToSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStateSchema {
    /// Position in seconds, as reported by the sender's player
    pub position: f32,
    pub is_playing: bool,
    /// Raw embedded-player state code, passed through untouched
    #[schema(value_type = Option<Object>)]
    pub player_state: Option<serde_json::Value>,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
