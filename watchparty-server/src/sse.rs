use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::get,
};
use futures_util::Stream;
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    convert::Infallible,
    pin::Pin,
    sync::{Arc, Weak},
    task::{Context, Poll, Waker},
};
use utoipa::ToSchema;
use watchparty_collab::{CollabEvent, GatewaySessionId, SessionRegistry};

use crate::{
    auth::Session,
    context::ServerContext,
    serialized::{ChatMessage, PartyMember, PlaybackState, ToSerialized},
    Router,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ServerEvent {
    /// A user became a member of the party
    UserJoined {
        party_id: i32,
        new_member: PartyMember,
    },
    /// A user left the party. `new_admin_id` is set when the departure
    /// handed adminship to another member.
    UserLeft {
        party_id: i32,
        user_id: i32,
        new_admin_id: Option<i32>,
    },
    /// A member was removed by the admin
    UserKicked {
        party_id: i32,
        user_id: i32,
        kicked_by: i32,
    },
    /// The party is being deleted by its admin
    PartyDeleted { party_id: i32, deleted_by: i32 },
    /// A chat message was posted to the party
    ChatMessage {
        party_id: i32,
        message: ChatMessage,
    },
    /// A member sent an emoji reaction
    Reaction {
        party_id: i32,
        user_id: i32,
        emoji: String,
    },
    /// A participant reported its playback state. Not delivered back to
    /// the reporter.
    PlaybackUpdate {
        party_id: i32,
        reporter_id: i32,
        state: PlaybackState,
    },
    /// A participant asked for a fresh playback report
    SyncRequested { party_id: i32, requester_id: i32 },
    /// A user entered the party's live session room
    SessionJoined { party_id: i32, user_id: i32 },
    /// A user left the party's live session room
    SessionLeft { party_id: i32, user_id: i32 },
}

impl From<CollabEvent> for ServerEvent {
    fn from(value: CollabEvent) -> Self {
        match value {
            CollabEvent::UserJoined {
                party_id,
                new_member,
            } => Self::UserJoined {
                party_id,
                new_member: new_member.to_serialized(),
            },
            CollabEvent::UserLeft {
                party_id,
                user_id,
                new_admin_id,
            } => Self::UserLeft {
                party_id,
                user_id,
                new_admin_id,
            },
            CollabEvent::UserKicked {
                party_id,
                user_id,
                kicked_by,
            } => Self::UserKicked {
                party_id,
                user_id,
                kicked_by,
            },
            CollabEvent::PartyDeleted {
                party_id,
                deleted_by,
            } => Self::PartyDeleted {
                party_id,
                deleted_by,
            },
            CollabEvent::ChatMessage { party_id, message } => Self::ChatMessage {
                party_id,
                message: message.to_serialized(),
            },
            CollabEvent::Reaction {
                party_id,
                user_id,
                emoji,
            } => Self::Reaction {
                party_id,
                user_id,
                emoji,
            },
            CollabEvent::PlaybackUpdate {
                party_id,
                reporter_id,
                state,
            } => Self::PlaybackUpdate {
                party_id,
                reporter_id,
                state: state.to_serialized(),
            },
            CollabEvent::SyncRequested {
                party_id,
                requester_id,
            } => Self::SyncRequested {
                party_id,
                requester_id,
            },
            CollabEvent::SessionJoined { party_id, user_id } => {
                Self::SessionJoined { party_id, user_id }
            }
            CollabEvent::SessionLeft { party_id, user_id } => {
                Self::SessionLeft { party_id, user_id }
            }
        }
    }
}

/// Manages server sent event connections, delivering each collab event to
/// the users in the originating party's live session room.
pub struct ServerSentEvents {
    me: Weak<Self>,
    registry: Arc<SessionRegistry>,
    connections: Mutex<Vec<Connection>>,
}

struct Connection {
    id: GatewaySessionId,
    user_id: i32,
    pending_messages: Arc<Mutex<Vec<ServerEvent>>>,
    waker: Arc<Mutex<Option<Waker>>>,
}

pub struct ConnectionHandle {
    id: GatewaySessionId,
    /// A reference to [Connection]'s pending messages
    pending_messages: Arc<Mutex<Vec<ServerEvent>>>,
    /// A reference to [Connection]'s stored [Waker]
    waker: Arc<Mutex<Option<Waker>>>,
    /// Required to remove connection when dropped
    manager: Weak<ServerSentEvents>,
}

impl ServerSentEvents {
    pub fn new(registry: Arc<SessionRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            registry,
            connections: Default::default(),
        })
    }

    /// Fans a collab event out to the connections of every user in the
    /// event's party room, honoring the event's exclusion.
    pub fn broadcast(&self, event: CollabEvent) {
        let recipients = self.registry.users_in_room(event.party_id());
        let excluded = event.excluded_user();

        let event: ServerEvent = event.into();
        let connections = self.connections.lock();

        for connection in connections.iter() {
            if Some(connection.user_id) == excluded {
                continue;
            }

            if recipients.contains(&connection.user_id) {
                connection.send(event.clone())
            }
        }
    }

    fn connect(&self, user_id: i32) -> ConnectionHandle {
        let connection = Connection::new(self.registry.register(user_id), user_id);
        let handle = connection.handle(self.me.clone());

        self.connections.lock().push(connection);
        handle
    }

    fn disconnect(&self, id: GatewaySessionId) {
        self.connections.lock().retain(|c| c.id != id);
        self.registry.unregister(id);
    }
}

impl Connection {
    fn new(id: GatewaySessionId, user_id: i32) -> Self {
        Self {
            id,
            user_id,
            pending_messages: Default::default(),
            waker: Default::default(),
        }
    }

    fn send(&self, message: ServerEvent) {
        self.pending_messages.lock().push(message);

        if let Some(waker) = self.waker.lock().take() {
            waker.wake()
        }
    }

    fn handle(&self, manager: Weak<ServerSentEvents>) -> ConnectionHandle {
        ConnectionHandle {
            id: self.id,
            pending_messages: self.pending_messages.clone(),
            waker: self.waker.clone(),
            manager,
        }
    }
}

impl Stream for ConnectionHandle {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut pending_messages = self.pending_messages.lock();

        if !pending_messages.is_empty() {
            // Oldest first, events must arrive in emission order
            let message = pending_messages.remove(0);
            let data = serde_json::to_string(&message).expect("serializes properly");

            return Poll::Ready(Some(Ok(Event::default().data(data))));
        }

        *self.waker.lock() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.disconnect(self.id)
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/events",
    tag = "events",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (
            status = 200,
            content_type = "text/event-stream",
            description = "A stream of events from the watchparty server",
            body = ServerEvent
        )
    )
)]
async fn event_stream(
    session: Session,
    State(context): State<ServerContext>,
) -> Sse<ConnectionHandle> {
    Sse::new(context.sse.connect(session.user().id)).keep_alive(KeepAlive::default())
}

pub fn router() -> Router {
    Router::new().route("/", get(event_stream))
}
