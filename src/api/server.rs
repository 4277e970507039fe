use crate::api::server_config::*;
use crate::network::rate_limit::RateLimiter;
use axum::{
    error_handling::HandleErrorLayer,
    http::{HeaderName, HeaderValue, Method, StatusCode},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::{limit::ConcurrencyLimitLayer, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::api::handlers;
use crate::api::middleware::{rate_limit::enforce_rate_limit, CALLER_HEADER};
use crate::core::approvals::ApprovalManager;
use crate::core::config::WalletConfig;
use crate::core::errors::WalletError;
use crate::core::ledger::Ledger;
use crate::core::rates::FixedRateOracle;

#[derive(Clone)]
pub struct WalletServer {
    pub ledger: Arc<Ledger>,
    pub approvals: Arc<ApprovalManager>,
    pub config: WalletConfig,
    pub rate_limiter: Arc<RateLimiter>,
}

impl WalletServer {
    pub fn new(config: WalletConfig) -> Result<Self, WalletError> {
        config.validate()?;
        let ledger = Arc::new(Ledger::new(&config.ledger)?);
        let oracle = Arc::new(FixedRateOracle::from_config(&config.rates)?);
        let approvals = Arc::new(ApprovalManager::new(&config.approvals, ledger.clone(), oracle));
        Self::from_parts(config, ledger, approvals)
    }

    /// Build around an existing ledger and manager, e.g. one driven by a
    /// manual clock. `approvals` must settle against `ledger`.
    pub fn from_parts(
        config: WalletConfig,
        ledger: Arc<Ledger>,
        approvals: Arc<ApprovalManager>,
    ) -> Result<Self, WalletError> {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.server.rate_limit_requests,
            Duration::from_secs(config.server.rate_limit_window_secs),
        )?);
        Ok(Self { ledger, approvals, config, rate_limiter })
    }

    fn cors_layer(&self) -> Result<CorsLayer, WalletError> {
        let origins = self
            .config
            .server
            .cors_origin
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                HeaderValue::from_str(s)
                    .map_err(|_| WalletError::ConfigError(format!("invalid CORS origin '{}'", s)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!("CORS configured to allow origins: {}", self.config.server.cors_origin);

        Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::ACCEPT,
                axum::http::header::ORIGIN,
                HeaderName::from_static(CALLER_HEADER),
            ])
            .expose_headers([axum::http::header::CONTENT_TYPE])
            .max_age(CORS_MAX_AGE))
    }

    pub fn create_router(self) -> Result<Router, WalletError> {
        let cors = self.cors_layer()?;
        let state = Arc::new(self);

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/wallets/create", post(handlers::register_wallet))
            .route("/wallets/me", get(handlers::get_my_wallet))
            .route("/transfer/prepare", post(handlers::prepare_transfer))
            .route("/transfer/execute", post(handlers::execute_transfer))
            .route("/transfer/cancel", post(handlers::cancel_transfer))
            .route("/transfer/:approval_id", get(handlers::transfer_status))
            .route("/history", get(handlers::get_history))
            .layer(axum::middleware::from_fn_with_state(state.clone(), enforce_rate_limit))
            .layer(
                ServiceBuilder::new()
                    // Convert middleware errors (timeout/overload) into HTTP responses
                    .layer(HandleErrorLayer::new(|err: BoxError| async move {
                        if err.is::<tower::timeout::error::Elapsed>() {
                            (StatusCode::REQUEST_TIMEOUT, "request timed out")
                        } else {
                            (StatusCode::SERVICE_UNAVAILABLE, "service overloaded")
                        }
                    }))
                    .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENCY))
                    .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
                    .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                    .layer(TraceLayer::new_for_http()),
            )
            .layer(cors)
            .with_state(state);
        Ok(router)
    }

    /// Periodically expire and collect approvals until the task is aborted.
    fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let approvals = self.approvals.clone();
        let every = Duration::from_secs(self.config.approvals.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let report = approvals.sweep_expired();
                if report.expired > 0 || report.collected > 0 {
                    tracing::info!(
                        "Approval sweep: {} expired, {} collected",
                        report.expired,
                        report.collected
                    );
                }
            }
        })
    }

    pub async fn start(self) -> Result<(), anyhow::Error> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let sweeper = self.spawn_sweeper();
        let app = self.create_router()?;
        tracing::info!("Server listening on {}", addr);
        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        sweeper.abort();
        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
