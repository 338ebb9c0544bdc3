pub mod auth;
pub mod chat;
pub mod cli;
pub mod models;
pub mod records;
pub mod server;
pub mod store;
pub mod triage;

use auth::{ ttl_from_hours, PasswordHasher, TokenService };
use cli::Args;
use log::{ info, warn };
use server::{ AppState, Server };
use std::error::Error;
use std::sync::Arc;
use triage::Predictor;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Store Type: {}", args.store_type);
    if !args.store_type.eq_ignore_ascii_case("memory") {
        info!("Store Host: {}", args.store_host);
        info!("Store Key Prefix: {}", args.store_prefix);
    }
    info!("Token Secret Configured: {}", args.jwt_secret.as_deref().is_some_and(|s| !s.trim().is_empty()));
    info!("Token TTL (hours): {}", args.token_ttl_hours);
    info!("Password Iterations: {}", args.password_iterations);
    info!("Model Directory: {}", args.model_dir);
    info!("Knowledge Directory: {}", args.knowledge_dir);
    info!("Symptom Match Cutoff: {}", args.match_cutoff);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let store = store::initialize_store(&args)?;

    let ttl = ttl_from_hours(args.token_ttl_hours).ok_or_else(||
        format!("TOKEN_TTL_HOURS {} is out of range", args.token_ttl_hours)
    )?;
    let tokens = Arc::new(TokenService::new(args.jwt_secret.clone(), ttl));
    if !tokens.is_configured() {
        warn!("JWT_SECRET_KEY is not set; registration and login will fail until it is configured");
    }

    let predictor = Predictor::load(&args.model_dir, &args.knowledge_dir, args.match_cutoff).map_err(
        |e| format!("Failed to load triage artifacts: {}", e)
    )?;
    info!("Symptom vocabulary loaded with {} columns", predictor.matcher().vocabulary().len());

    let state = AppState::new(
        store,
        tokens,
        PasswordHasher::new(args.password_iterations),
        Arc::new(predictor)
    );
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, state, args);
    server.run().await?;

    Ok(())
}
