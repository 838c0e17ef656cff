use crate::settings::Database;
use actix_web::rt;
use anyhow::{Context, Result};
use refinery::include_migration_mods;
use refinery_core::tokio_postgres::{connect, NoTls};

include_migration_mods!("src/db/migrations");

async fn start_migration_from_url(url: String) -> Result<()> {
    let (mut client, conn) = connect(&url, NoTls)
        .await
        .context("Unable to connect to database")?;

    rt::spawn(async move {
        if let Err(e) = conn.await {
            log::error!("connection error: {}", e)
        }
    });

    // The runner is specified through the `include_migration_mods` macro
    runner().run_async(&mut client).await?;

    Ok(())
}

pub async fn start_migration(db_config: &Database) -> Result<()> {
    let connection_config = format!(
        "host={} port={} dbname={} user={} password={}",
        db_config.server, db_config.port, db_config.name, db_config.user, db_config.password
    );

    start_migration_from_url(connection_config).await
}
