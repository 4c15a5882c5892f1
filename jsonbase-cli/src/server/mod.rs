mod routes;
mod state;

use std::process;
use std::sync::Arc;

use axum::routing::{delete, get};
use axum::Router;
use tower_http::compression::CompressionLayer;

use self::routes::{
    handle_clear, handle_create_user, handle_get_global, handle_get_private, handle_global_meta,
    handle_health, handle_list_users, handle_put_global, handle_put_private, handle_user_exists,
    handle_user_meta,
};
use self::state::AppState;
use crate::config::JsonbaseConfig;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/global/{key}",
            get(handle_get_global).put(handle_put_global),
        )
        .route("/users", get(handle_list_users))
        .route(
            "/users/{id}",
            get(handle_user_exists).post(handle_create_user),
        )
        .route(
            "/users/{id}/{key}",
            get(handle_get_private).put(handle_put_private),
        )
        .route("/meta", get(handle_global_meta))
        .route("/meta/{id}", get(handle_user_meta))
        .route("/data", delete(handle_clear))
        .layer(CompressionLayer::new())
        .with_state(state)
}

pub async fn run_serve(
    config: JsonbaseConfig,
    port_arg: Option<u16>,
    hostname_arg: Option<String>,
) {
    // CLI args override config file and environment values
    let port = port_arg.unwrap_or(config.server.port);
    let hostname = hostname_arg.unwrap_or_else(|| config.server.hostname.clone());

    let store = config.build_store();
    if let Err(e) = store.try_ensure_initialized().await {
        eprintln!("Failed to initialize {}: {}", store.root().display(), e);
        process::exit(1);
    }

    let state = Arc::new(AppState::new(store, config.store.pretty));
    let app = router(Arc::clone(&state));

    let addr = format!("{}:{}", hostname, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Failed to bind to {}: {}", addr, e);
            process::exit(1);
        });

    println!(
        "Serving {} on http://{}",
        state.store.root().display(),
        addr
    );

    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    eprintln!("Failed to install SIGTERM handler: {}", e);
                    process::exit(1);
                }
            };

        #[cfg(unix)]
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }

        #[cfg(not(unix))]
        ctrl_c.await.ok();

        tracing::info!("shutdown signal received, finishing in-flight requests");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Server error: {}", e);
            process::exit(1);
        });

    println!("Server stopped");
}
