mod auth;
mod context;
mod docs;
mod errors;
mod parties;
mod schemas;
mod serialized;
mod sse;

use axum::routing::get;
use log::info;
use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
    thread,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use watchparty_collab::{Collab, PgDatabase};

pub use context::ServerContext;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub type Router = axum::Router<ServerContext>;

/// Starts the watchparty server
pub async fn run_server(collab: Arc<Collab<PgDatabase>>) -> Result<(), std::io::Error> {
    let port = env::var("WATCHPARTY_SERVER_PORT")
        .ok()
        .and_then(|x| x.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let sse = sse::ServerSentEvents::new(collab.sessions());
    let context = ServerContext {
        collab: collab.clone(),
        sse: sse.clone(),
    };

    // Distributes collab events to connected users for as long as the
    // server runs
    thread::spawn(move || loop {
        sse.broadcast(collab.wait_for_event())
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/parties", parties::router())
        .nest("/events", sse::router())
        .merge(auth::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await?;

    info!("watchparty server listening on {}", addr);

    axum::serve(listener, root_router.into_make_service()).await
}
