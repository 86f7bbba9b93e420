use std::env::var;
use myro::{Config, Connection, Result, connection::SslMode};

pub async fn main() -> Result<()> {
    let Ok(url) = var("DATABASE_URL") else {
        tracing::info!("DATABASE_URL not set, skipping connection");
        return Ok(());
    };

    let mut conn = match Connection::connect(&url).await {
        Ok(ok) => ok,
        // without ssl only passwordless accounts can authenticate
        Err(err) => {
            tracing::warn!(%err, "connection refused");
            return Ok(());
        },
    };
    let session = conn.session();
    tracing::info!(
        server_version = session.server_version(),
        connection_id = session.connection_id(),
        capabilities = ?session.capabilities(),
        "connected"
    );
    conn.ping().await?;
    conn.close().await?;

    let config = Config::from_env().with_ssl_mode(SslMode::Disabled);
    let mut conn = Connection::connect_with(config).await?;
    conn.ping().await?;
    conn.close().await?;

    Ok(())
}
