//! Server mode
//!
//! Builds the service layer, starts the maintenance task and serves `/api`.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

use crate::api::api_routes;
use crate::config::get_config;
use crate::runtime::lifetime;
use crate::runtime::lifetime::startup::StartupContext;

/// 把服务注册为 actix app_data（服务端与 HTTP 测试共用）
pub fn configure_app(context: StartupContext) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(context.storage.clone()))
            .app_data(web::Data::new(context.statistics.clone()))
            .app_data(web::Data::new(context.engagement.clone()))
            .app_data(web::Data::new(context.content.clone()))
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .service(api_routes());
    }
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let context = lifetime::startup::prepare_startup().await.map_err(|e| {
        tracing::error!("Server startup failed: {}", e);
        e
    })?;

    let config = get_config();

    let maintenance = Arc::new(context.maintenance_task());
    maintenance.spawn_background_task(config.statistics.cleanup_interval_hours);

    if config.server.trusted_proxies.is_empty() {
        warn!(
            "Client IP: auto-detect mode. Connections from private IPs will use X-Forwarded-For. \
             Configure server.trusted_proxies to restrict this."
        );
    } else {
        warn!(
            "Client IP: explicit trusted proxies configured: {:?}",
            config.server.trusted_proxies
        );
    }

    let db_for_shutdown = context.storage.get_db().clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new().add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .configure(configure_app(context.clone()))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000));

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&db_for_shutdown) => {
            warn!("Graceful shutdown completed");
        }
    }

    Ok(())
}
