use std::sync::Arc;

use axum::extract::FromRef;
use watchparty_collab::{Collab, PgDatabase};

use crate::sse::ServerSentEvents;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub collab: Arc<Collab<PgDatabase>>,
    pub sse: Arc<ServerSentEvents>,
}
