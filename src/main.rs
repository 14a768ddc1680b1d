use std::{env, sync::Arc};

use anyhow::Context;
use log::info;
use watchparty_collab::{Collab, PgDatabase};
use watchparty_server::run_server;

mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logger();

    let database_url = env::var("WATCHPARTY_DATABASE_URL")
        .context("WATCHPARTY_DATABASE_URL must be set to a postgres connection string")?;

    info!("Connecting to database...");
    let database = PgDatabase::new(&database_url)
        .await
        .context("Could not connect to database")?;

    let collab = Arc::new(Collab::new(database));

    collab
        .init()
        .await
        .context("Could not restore persisted state")?;

    info!("Initialized successfully.");

    run_server(collab).await.context("Server stopped")?;

    Ok(())
}
