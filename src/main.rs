use std::sync::Arc;
use std::time::Instant;

use actix_web::dev::Service as _;
use actix_web::{middleware::Logger, web, App, HttpServer};
use campus_backend::api::openapi;
use campus_backend::api::routes::{self, AppState};
use campus_backend::application::SessionService;
use campus_backend::config::AppConfig;
use campus_backend::infrastructure::credentials::PgCredentialVerifier;
use campus_backend::infrastructure::db::pool::create_pool;
use campus_backend::infrastructure::store::{
    self, InMemorySessionStore, InMemoryTokenBlacklist, RedisSessionStore, RedisTokenBlacklist,
    SessionStore, TokenBlacklist,
};
use campus_backend::observability::error_tracking::capture_unexpected_5xx;
use campus_backend::observability::AppMetrics;
use campus_backend::security::{
    cors_middleware, security_headers, Clock, LoginThrottle, SystemClock,
};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().expect("failed to load application configuration");
    config.validate().expect("configuration is invalid");

    let registry =
        tracing_subscriber::registry().with(EnvFilter::new(config.logging.level.clone()));
    if config.logging.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .init();
    } else {
        registry.with(fmt::layer()).init();
    }

    let pool = create_pool(&config.database)
        .await
        .expect("failed to create database pool");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (sessions, blacklist): (Arc<dyn SessionStore>, Arc<dyn TokenBlacklist>) =
        match config.store.url.as_deref() {
            Some(url) => {
                let manager = store::connect(url, &config.store)
                    .await
                    .expect("failed to connect to the session store");
                (
                    Arc::new(RedisSessionStore::new(manager.clone(), &config.store)),
                    Arc::new(RedisTokenBlacklist::new(manager, &config.store)),
                )
            }
            None => {
                tracing::warn!(
                    "STORE_URL is not set; sessions live in process memory and will not survive \
                     a restart or be shared across instances"
                );
                (
                    Arc::new(InMemorySessionStore::new(clock.clone())),
                    Arc::new(InMemoryTokenBlacklist::new(clock.clone())),
                )
            }
        };

    let throttle = Arc::new(LoginThrottle::new(config.throttle.clone(), clock.clone()));
    let credentials = Arc::new(PgCredentialVerifier::new(pool.clone()));

    let state = AppState {
        session_service: Arc::new(SessionService::new(
            credentials,
            sessions.clone(),
            blacklist,
            throttle.clone(),
            clock,
            config.auth.clone(),
        )),
        sessions,
        security: config.security.clone(),
        login_throttle: throttle.clone(),
        metrics: Arc::new(AppMetrics::default()),
        db_pool: pool,
    };

    let sweeper = {
        let throttle = throttle.clone();
        let period = std::time::Duration::from_secs(throttle.sweep_interval_seconds());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = throttle.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, "idle throttle records swept");
                }
            }
        })
    };

    let janitor = {
        let service = state.session_service.clone();
        let period = std::time::Duration::from_secs(config.store.cleanup_interval_seconds);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // interval fires immediately on the first tick; skip it so the
            // store is not hit during startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match service.cleanup().await {
                    Ok(removed) if removed > 0 => {
                        tracing::info!(removed, "expired sessions reclaimed");
                    }
                    Ok(_) => {}
                    Err(error) => tracing::warn!(error = %error, "session cleanup pass failed"),
                }
            }
        })
    };

    let bind_host = config.host.clone();
    let bind_port = config.port;
    let security_config = config.security.clone();
    let metrics = state.metrics.clone();
    let serve_docs = !config.is_production();

    info!(
        host = %bind_host,
        port = bind_port,
        environment = %config.environment,
        "starting campus-backend"
    );

    let server = HttpServer::new(move || {
        let metrics = metrics.clone();
        let app = App::new()
            .wrap(Logger::default())
            .wrap_fn(move |req, srv| {
                let request_id = Uuid::new_v4().to_string();
                let path = req.path().to_string();
                let method = req.method().to_string();
                let metrics = metrics.clone();
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(mut response) => {
                            response.headers_mut().insert(
                                actix_web::http::header::HeaderName::from_static("x-request-id"),
                                actix_web::http::header::HeaderValue::from_str(&request_id)
                                    .unwrap_or_else(|_| {
                                        actix_web::http::header::HeaderValue::from_static(
                                            "invalid-request-id",
                                        )
                                    }),
                            );

                            let status = response.status().as_u16();
                            let latency_ms = start.elapsed().as_millis() as u64;
                            metrics.record_request(status, latency_ms);

                            info!(
                                request_id = %request_id,
                                method = %method,
                                path = %path,
                                status = status,
                                latency_ms = latency_ms,
                                "request completed"
                            );

                            if status >= 500 {
                                let _ = capture_unexpected_5xx(&path, &method, status, &request_id);
                            }
                            Ok(response)
                        }
                        Err(error) => Err(error),
                    }
                }
            })
            .wrap(cors_middleware(&security_config))
            .wrap(security_headers())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure);

        if serve_docs {
            app.configure(openapi::configure_swagger_ui)
        } else {
            app
        }
    })
    .bind((bind_host, bind_port))?
    .run();

    let outcome = server.await;
    sweeper.abort();
    janitor.abort();
    outcome
}
