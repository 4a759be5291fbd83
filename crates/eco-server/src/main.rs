mod config;

use std::sync::Arc;

use tracing::info;

use eco_api::auth::{AppStateInner, create_token};
use eco_api::router::build_router;
use eco_gateway::Dispatcher;
use eco_types::models::ActorProfile;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecoconnect=debug,eco_gateway=debug,eco_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // `ecoconnect token <user_id> <name> [--admin]` prints a session token
    // for local testing against the gateway and REST API.
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("token") {
        return print_token(&config, &args[1..]);
    }

    // Init database
    let db = Arc::new(eco_db::Database::open(&config.db_path)?);

    // Shared state
    let dispatcher = Dispatcher::new(config.broadcast_capacity);
    let state = AppStateInner::new(db, config.jwt_secret.clone(), dispatcher, config.gateway.clone());

    let app = build_router(state);

    info!(
        "EcoConnect realtime listening on {} (heartbeat every {:?})",
        config.addr, config.gateway.heartbeat_interval
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_token(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let (user_id, name) = match args {
        [user_id, name, ..] => (user_id.clone(), name.clone()),
        _ => anyhow::bail!("usage: ecoconnect token <user_id> <name> [--admin]"),
    };
    let is_admin = args.iter().any(|a| a == "--admin");

    let profile = ActorProfile {
        id: user_id,
        name,
        profile_image: None,
    };
    println!("{}", create_token(&config.jwt_secret, &profile, is_admin)?);
    Ok(())
}
