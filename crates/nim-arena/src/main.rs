use nim_arena::{NimArenaError, NimArenaServerBuilder, ServerConfig, telemetry};

#[tokio::main]
async fn main() -> Result<(), NimArenaError> {
    telemetry::init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        health = config.health_addr.as_deref().unwrap_or("off"),
        piles = config.game.pile_count,
        "starting Nim Arena"
    );

    let server = NimArenaServerBuilder::from_config(config).build().await?;
    server.run().await
}
