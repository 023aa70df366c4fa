use slipstream_core::GLOBAL_CONFIG;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

mod game;

fn main() {
    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(GLOBAL_CONFIG.log_filter.as_str()));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    // kick off the game loop
    let ip_addr = format!("{}:{}", GLOBAL_CONFIG.server_address, GLOBAL_CONFIG.port);
    match game::GameServer::new(&ip_addr) {
        Ok(mut server) => server.start_loop(),
        Err(e) => {
            error!(address = %ip_addr, error = %e, "could not start the game server");
            std::process::exit(1);
        }
    }
}
