//! Necromancy - login and world front-end server
//!
//! Main server binary: loads `config/serveroptions.txt`, starts both endpoint
//! listeners and runs until Ctrl-C.

use necromancy_config::{LogSinkKind, ServerConfig};
use necromancy_core::{Endpoint, LogSink, TracingSink, WriterSink};
use necromancy_game::{LoginOptions, LoginServer, WorldServer};
use necromancy_network::{EndpointListener, ListenerConfig};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Loaded before tracing starts so `loglevel` can seed the filter
    let config = ServerConfig::load_default();

    // RUST_LOG wins over the configured level
    let log_level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| ServerConfig::default().log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Necromancy server starting up...");

    let config = match config {
        Ok(config) => {
            info!("Configuration loaded from {}", necromancy_config::DEFAULT_CONFIG_PATH);
            config
        }
        Err(e) => {
            warn!("{}", e);
            warn!("Using default configuration");
            ServerConfig::default()
        }
    };
    config.display();

    let sink: Arc<dyn LogSink> = match config.log_sink {
        LogSinkKind::Tracing => Arc::new(TracingSink::new()),
        LogSinkKind::Console => Arc::new(WriterSink::stdout()),
    };

    let login = LoginServer::new(
        LoginOptions {
            primary_address: config.world_ip.clone(),
            secondary_address: config.world_ip2.clone(),
            send_login_response: config.send_login_response,
        },
        sink.clone(),
    );
    let world = WorldServer::new(sink);

    let login = Arc::new(EndpointListener::bind(listener_config(&config, Endpoint::Login)?, Arc::new(login))?);
    let world = Arc::new(EndpointListener::bind(listener_config(&config, Endpoint::World)?, Arc::new(world))?);

    let login_task = spawn_listener(login.clone());
    let world_task = spawn_listener(world.clone());

    info!("Server is ready to accept connections");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }

    info!("Shutting down...");
    login.shutdown();
    world.shutdown();

    for task in [login_task, world_task] {
        if let Err(e) = task.await {
            error!("Listener task failed: {}", e);
        }
    }

    info!("Server stopped");
    Ok(())
}

fn listener_config(config: &ServerConfig, endpoint: Endpoint) -> necromancy_core::Result<ListenerConfig> {
    Ok(ListenerConfig {
        bind_address: config.bind_address(endpoint)?,
        max_connections: config.max_connections,
        ..ListenerConfig::for_endpoint(endpoint)
    })
}

fn spawn_listener(listener: Arc<EndpointListener>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let endpoint = listener.endpoint();
        if let Err(e) = listener.run().await {
            error!("{} endpoint error: {}", endpoint, e);
        }
    })
}
