use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json,
};
use watchparty_collab::{
    JoinRequestDecision, NewPartyParams, PartyError, PlaybackState,
};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{
        AddMemberSchema, JoinRequestActionSchema, JoinRequestResolutionSchema, KickSchema,
        NewChatMessageSchema, NewPartySchema, PlaybackStateSchema, ReactionSchema, ValidatedJson,
    },
    serialized::{ChatMessage, JoinRequest, Party, PartyMember, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/parties",
    tag = "parties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Party>)
    )
)]
async fn list_parties(_session: Session, State(context): State<ServerContext>) -> impl IntoResponse {
    let parties: Vec<_> = context
        .collab
        .parties
        .list_active()
        .into_iter()
        .map(|p| p.data().to_serialized())
        .collect();

    Json(parties)
}

#[utoipa::path(
    get,
    path = "/v1/parties/mine",
    tag = "parties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Party>)
    )
)]
async fn my_parties(session: Session, State(context): State<ServerContext>) -> impl IntoResponse {
    let parties: Vec<_> = context
        .collab
        .parties
        .list_for_user(session.user().id)
        .into_iter()
        .map(|p| p.data().to_serialized())
        .collect();

    Json(parties)
}

#[utoipa::path(
    post,
    path = "/v1/parties",
    tag = "parties",
    request_body = NewPartySchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Party)
    )
)]
async fn create_party(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewPartySchema>,
) -> ServerResult<Json<Party>> {
    let party = context
        .collab
        .parties
        .create_party(NewPartyParams {
            name: body.name,
            visibility: body.visibility.into(),
            video_url: body.video_url,
            user_id: session.user().id,
        })
        .await?;

    Ok(Json(party.data().to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/parties/{id}",
    tag = "parties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Party)
    )
)]
async fn party(
    _session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
) -> ServerResult<Json<Party>> {
    let party = context.collab.parties.party_by_id(party_id)?;

    Ok(Json(party.data().to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/join",
    tag = "parties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Party),
        (status = 403, description = "The party is private, a join request was filed instead")
    )
)]
async fn join_party(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
) -> ServerResult<Json<Party>> {
    let party = context.collab.parties.party_by_id(party_id)?;
    let user_id = session.user().id;

    match party.join(user_id).await {
        Ok(()) => Ok(Json(party.data().to_serialized())),
        // Private parties take requests instead of direct joins
        Err(PartyError::PrivateParty) => {
            party.request_join(user_id).await?;

            Err(ServerError::Forbidden(
                "This party is private, a join request has been filed".to_string(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/leave",
    tag = "parties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "User left the party")
    )
)]
async fn leave_party(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
) -> ServerResult<()> {
    let party = context.collab.parties.party_by_id(party_id)?;

    party.leave(session.user().id).await?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/kick",
    tag = "parties",
    request_body = KickSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Member was removed from the party")
    )
)]
async fn kick_member(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
    Json(body): Json<KickSchema>,
) -> ServerResult<()> {
    let party = context.collab.parties.party_by_id(party_id)?;

    party.kick(session.user().id, body.user_id).await?;
    Ok(())
}

#[utoipa::path(
    delete,
    path = "/v1/parties/{id}",
    tag = "parties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Party and everything belonging to it was deleted")
    )
)]
async fn delete_party(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
) -> ServerResult<()> {
    let party = context.collab.parties.party_by_id(party_id)?;

    party.delete(session.user().id).await?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/members",
    tag = "parties",
    request_body = AddMemberSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = PartyMember)
    )
)]
async fn add_member(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
    Json(body): Json<AddMemberSchema>,
) -> ServerResult<Json<PartyMember>> {
    let party = context.collab.parties.party_by_id(party_id)?;
    let member = party.add_member(session.user().id, body.user_id).await?;

    Ok(Json(member.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/parties/{id}/requests",
    tag = "parties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<JoinRequest>)
    )
)]
async fn pending_requests(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
) -> ServerResult<Json<Vec<JoinRequest>>> {
    let party = context.collab.parties.party_by_id(party_id)?;
    let requests = party.pending_requests(session.user().id).await?;

    Ok(Json(requests.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/requests/{request_id}",
    tag = "parties",
    request_body = JoinRequestResolutionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = JoinRequest)
    )
)]
async fn resolve_request(
    session: Session,
    State(context): State<ServerContext>,
    Path((party_id, request_id)): Path<(i32, i32)>,
    Json(body): Json<JoinRequestResolutionSchema>,
) -> ServerResult<Json<JoinRequest>> {
    let party = context.collab.parties.party_by_id(party_id)?;

    let decision = match body.action {
        JoinRequestActionSchema::Approve => JoinRequestDecision::Approve,
        JoinRequestActionSchema::Reject => JoinRequestDecision::Reject,
    };

    let resolved = party
        .resolve_request(request_id, session.user().id, decision)
        .await?;

    Ok(Json(resolved.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/parties/{id}/messages",
    tag = "parties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<ChatMessage>)
    )
)]
async fn message_history(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
) -> ServerResult<Json<Vec<ChatMessage>>> {
    let party = context.collab.parties.party_by_id(party_id)?;
    let messages = party.message_history(session.user().id).await?;

    Ok(Json(messages.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/messages",
    tag = "parties",
    request_body = NewChatMessageSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = ChatMessage)
    )
)]
async fn send_message(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<NewChatMessageSchema>,
) -> ServerResult<Json<ChatMessage>> {
    let party = context.collab.parties.party_by_id(party_id)?;
    let message = party.send_message(session.user().id, &body.message).await?;

    Ok(Json(message.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/reactions",
    tag = "parties",
    request_body = ReactionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Reaction was relayed to the party's session")
    )
)]
async fn send_reaction(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<ReactionSchema>,
) -> ServerResult<()> {
    let party = context.collab.parties.party_by_id(party_id)?;

    party.send_reaction(session.user().id, &body.emoji)?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/playback",
    tag = "parties",
    request_body = PlaybackStateSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Playback state was relayed to the party's session")
    )
)]
async fn report_playback(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
    Json(body): Json<PlaybackStateSchema>,
) -> ServerResult<()> {
    let party = context.collab.parties.party_by_id(party_id)?;

    party.report_playback(
        session.user().id,
        PlaybackState {
            position: body.position,
            is_playing: body.is_playing,
            player_state: body.player_state,
        },
    );

    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/playback/sync",
    tag = "parties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "A sync was requested from the party's session")
    )
)]
async fn request_sync(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
) -> ServerResult<()> {
    let party = context.collab.parties.party_by_id(party_id)?;

    party.request_sync(session.user().id);
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/presence",
    tag = "parties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "User entered the party's live session room")
    )
)]
async fn join_session(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
) -> ServerResult<()> {
    let party = context.collab.parties.party_by_id(party_id)?;
    let user_id = session.user().id;

    party.authorize(user_id)?;
    party.join_session(user_id);

    Ok(())
}

#[utoipa::path(
    delete,
    path = "/v1/parties/{id}/presence",
    tag = "parties",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "User left the party's live session room")
    )
)]
async fn leave_session(
    session: Session,
    State(context): State<ServerContext>,
    Path(party_id): Path<i32>,
) -> ServerResult<()> {
    let party = context.collab.parties.party_by_id(party_id)?;

    party.leave_session(session.user().id);
    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_parties))
        .route("/", post(create_party))
        .route("/mine", get(my_parties))
        .route("/:id", get(party))
        .route("/:id", delete(delete_party))
        .route("/:id/join", post(join_party))
        .route("/:id/leave", post(leave_party))
        .route("/:id/kick", post(kick_member))
        .route("/:id/members", post(add_member))
        .route("/:id/requests", get(pending_requests))
        .route("/:id/requests/:request_id", post(resolve_request))
        .route("/:id/messages", get(message_history))
        .route("/:id/messages", post(send_message))
        .route("/:id/reactions", post(send_reaction))
        .route("/:id/playback", post(report_playback))
        .route("/:id/playback/sync", post(request_sync))
        .route("/:id/presence", post(join_session))
        .route("/:id/presence", delete(leave_session))
}
