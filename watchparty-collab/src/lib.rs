mod db;
mod events;
mod parties;
mod sessions;
mod util;
mod video;

use std::sync::Arc;

use crossbeam::channel::unbounded;
use dashmap::DashMap;

pub use db::*;
pub use events::*;
pub use parties::*;
pub use sessions::*;
pub use video::extract_video_id;

/// A concurrent store of shared handles, keyed by id
pub(crate) type ArcedStore<K, V> = Arc<DashMap<K, Arc<V>>>;

/// The watchparty collab system, facilitating party management, chat,
/// playback relay, and live session presence.
pub struct Collab<Db> {
    context: CollabContext<Db>,
    event_receiver: EventReceiver,

    pub parties: PartyManager<Db>,
}

/// A type passed to various components of the collab system, to access state,
/// emit events, and dispatch actions.
pub struct CollabContext<Db> {
    pub database: Arc<Db>,
    pub sessions: Arc<SessionRegistry>,

    pub parties: ArcedStore<PartyId, Party<Db>>,

    event_sender: EventSender,
}

impl<Db> Collab<Db>
where
    Db: Database,
{
    pub fn new(database: Db) -> Self {
        Self::attach(Arc::new(database))
    }

    /// Builds a collab over an already shared database handle
    pub fn attach(database: Arc<Db>) -> Self {
        let (event_sender, event_receiver) = unbounded();

        let context = CollabContext {
            database,
            sessions: Arc::new(SessionRegistry::new()),
            parties: Default::default(),
            event_sender,
        };

        let party_manager = PartyManager::new(&context);

        Self {
            context,
            event_receiver,
            parties: party_manager,
        }
    }

    /// Initializes the collab system, mirroring persisted parties into
    /// memory. Must be called before anything else.
    pub async fn init(&self) -> Result<()> {
        self.parties.restore().await
    }

    pub fn database(&self) -> Arc<Db> {
        self.context.database.clone()
    }

    pub fn sessions(&self) -> Arc<SessionRegistry> {
        self.context.sessions.clone()
    }

    /// Looks up an authentication session by its bearer token
    pub async fn session(&self, token: &str) -> Result<SessionData> {
        self.context.database.session_by_token(token).await
    }

    /// Blocks until the next collab event arrives. Used by the event
    /// distribution loop.
    pub fn wait_for_event(&self) -> CollabEvent {
        self.event_receiver
            .recv()
            .expect("event channel cannot close while Collab holds a sender")
    }
}

impl<Db> CollabContext<Db>
where
    Db: Database,
{
    /// Emits a collab event, to be distributed to connected users
    pub fn emit(&self, event: CollabEvent) {
        let _ = self.event_sender.send(event);
    }
}

impl<Db> Clone for CollabContext<Db>
where
    Db: Database,
{
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            sessions: self.sessions.clone(),
            parties: self.parties.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}
