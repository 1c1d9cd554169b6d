use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::app::manager::AppRegistry;
use crate::error::{Error, Result};
use crate::http_handler;
use crate::middleware;
use crate::options::ServerOptions;
use crate::websocket::handler::ws_handler;

/// Shared state for one listener. `secure` records whether the listener
/// terminates TLS, which the handshake needs for `only_ssl` apps.
pub struct ServerState {
    pub apps: Arc<AppRegistry>,
    pub secure: bool,
    pub profiling: bool,
}

pub fn build_router(state: Arc<ServerState>) -> Router {
    let api = Router::new()
        .route("/apps/{app_id}/events", post(http_handler::publish_events))
        .route("/apps/{app_id}/channels", get(http_handler::list_channels))
        .route(
            "/apps/{app_id}/channels/{channel_name}",
            get(http_handler::channel_info),
        )
        .route(
            "/apps/{app_id}/channels/{channel_name}/users",
            get(http_handler::channel_users),
        )
        // Outermost first: the app gate runs before the authenticator.
        .layer(from_fn_with_state(
            state.clone(),
            middleware::authenticate_request,
        ))
        .layer(from_fn_with_state(state.clone(), middleware::check_app_enabled));

    let mut router = Router::new()
        .route("/app/{key}", get(ws_handler))
        .merge(api);

    if state.profiling {
        router = router.route("/debug/stats", get(http_handler::debug_stats));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

/// Serve the broker on the configured listeners until one of them fails.
pub async fn run(options: ServerOptions, registry: Arc<AppRegistry>) -> Result<()> {
    let http_addr: SocketAddr = options
        .host
        .parse()
        .map_err(|e| Error::Config(format!("invalid listen address {}: {e}", options.host)))?;

    let http_state = Arc::new(ServerState {
        apps: Arc::clone(&registry),
        secure: false,
        profiling: options.profiling,
    });
    let http_router = build_router(http_state);

    if options.ssl.enabled {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let tls_addr: SocketAddr = options.ssl.host.parse().map_err(|e| {
            Error::Config(format!("invalid SSL listen address {}: {e}", options.ssl.host))
        })?;
        let tls_config =
            RustlsConfig::from_pem_file(&options.ssl.cert_file, &options.ssl.key_file).await?;

        let tls_state = Arc::new(ServerState {
            apps: registry,
            secure: true,
            profiling: options.profiling,
        });
        let tls_router = build_router(tls_state);

        info!("starting HTTPS service on {tls_addr}");
        info!("starting HTTP service on {http_addr}");

        tokio::try_join!(
            axum_server::bind(http_addr).serve(http_router.into_make_service()),
            axum_server::bind_rustls(tls_addr, tls_config).serve(tls_router.into_make_service()),
        )?;
    } else {
        info!("starting HTTP service on {http_addr}");
        axum_server::bind(http_addr)
            .serve(http_router.into_make_service())
            .await?;
    }

    Ok(())
}
