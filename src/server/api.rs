use axum::Router;
use log::info;
use std::error::Error;
use std::net::SocketAddr;

use crate::cli::Args;

/// Serves `app` until the listener fails. TLS is used only when it is enabled
/// and both PEM paths are given.
pub async fn start_http_server(
    addr: &str,
    app: Router,
    args: &Args
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;

    match (args.enable_tls, args.tls_cert_path.as_deref(), args.tls_key_path.as_deref()) {
        (true, Some(cert_path), Some(key_path)) => {
            // Both ring and aws-lc-rs are compiled in, so rustls needs an explicit choice.
            let _ = rustls::crypto::ring::default_provider().install_default();
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;

            info!("Starting HTTPS API server on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
        }
        (true, _, _) => {
            return Err("ENABLE_TLS requires both TLS_CERT_PATH and TLS_KEY_PATH".into());
        }
        _ => {
            let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
                format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
            })?;
            info!("Starting HTTP API server on: http://{}", addr);
            axum::serve(listener, app.into_make_service()).await?;
        }
    }

    Ok(())
}
