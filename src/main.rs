//! walletauth entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Connect to Redis (or fall back to the in-memory store)
//! 3. Build router with API routes + static login page
//! 4. Start Axum server
//!
//! Also supports `keygen` and `sign` subcommands for exercising the login
//! flow without a browser wallet.

use std::net::SocketAddr;
use walletauth::{
    auth::{challenge_message, middleware::AppState, wallet},
    config::Config,
    routes,
    storage::RedisStore,
};

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  walletauth                         Run the server");
    eprintln!("  walletauth keygen                  Generate a test wallet key");
    eprintln!("  walletauth sign <secret> <nonce>   Sign the login message for a nonce");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  walletauth keygen");
    eprintln!("  curl -X POST localhost:3000/api/auth/nonce -d '{{\"address\":\"0x...\"}}' \\");
    eprintln!("       -H 'content-type: application/json'");
    eprintln!("  walletauth sign <secret> <nonce>");
}

/// Handle CLI subcommands. Returns `None` when the server should start.
fn run_subcommand(args: &[String]) -> Option<Result<(), String>> {
    match args.get(1).map(String::as_str) {
        None => None,
        Some("keygen") if args.len() == 2 => {
            let key = wallet::generate_secret_key();
            println!("secret:  0x{}", hex::encode(key.secret_bytes()));
            println!("address: {}", wallet::address_of_secret(&key));
            Some(Ok(()))
        }
        Some("sign") if args.len() == 4 => Some(
            wallet::parse_secret_key(&args[2]).map(|key| {
                println!("{}", wallet::sign_message(&key, &challenge_message(&args[3])));
            }),
        ),
        Some(_) => {
            print_usage();
            Some(Err("invalid arguments".to_string()))
        }
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if let Some(result) = run_subcommand(&args) {
        if let Err(e) = result {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("Failed to load config");
    tracing::info!(?config, "Starting walletauth on {}", config.bind_addr);

    let bind_addr = config.bind_addr;
    let state = match config.redis_url.clone() {
        Some(url) => {
            let store = RedisStore::open(&url).expect("Invalid Redis URL");
            store.ping().await.expect("Failed to connect to Redis");
            AppState::redis(config, store)
        }
        None => {
            tracing::warn!("REDIS_URL not set; identities and sessions are kept in memory");
            AppState::in_memory(config)
        }
    };
    tracing::info!(nonce_policy = %state.verifier.policy(), "Login nonce policy");

    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", bind_addr);

    // with_connect_info required for ConnectInfo<SocketAddr> extractors
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
