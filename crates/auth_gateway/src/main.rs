// Auth Gateway Server
//
// Standalone session gateway: redirects unauthenticated browsers to the
// configured identity provider and completes the login on /auth/callback

use auth_gateway::{start_server, GatewayConfig};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Auth Gateway Server");
    println!();

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let host = args.get(1).map(|s| s.as_str()).unwrap_or("127.0.0.1");
    let port = args.get(2)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8080);

    let config = GatewayConfig::from_env()?;
    println!("[OK] Identity provider client: {}", config.idp.client_id);
    println!("[OK] Authorization endpoint: {}", config.idp.auth_url);
    println!("[OK] Redirect URI: {}", config.idp.redirect_uri);
    println!("[OK] CORS origin: {}", config.frontend_origin);
    match config.session_ttl {
        Some(ttl) => println!("[OK] Session TTL: {}s", ttl.as_secs()),
        None => println!("[INFO] Session TTL disabled; sessions live until restart"),
    }

    println!();
    println!("[INFO] Starting Auth Gateway on {}:{}", host, port);
    println!();

    start_server(host, port, config).await?;

    Ok(())
}
