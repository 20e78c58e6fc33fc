//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the lookup handler
//! - Wire up middleware (tracing, timeout, request ID, access log)
//! - Bind every configured listener and hand them to the supervisor
//! - Resolve attributes and dispatch to the negotiator

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::attributes::{AttributeResolver, DnsLookup, HostnameLookup, RequestSnapshot};
use crate::config::AppConfig;
use crate::http::request::{access_log, MakeRequestUuid};
use crate::http::response::{render, Rendered};
use crate::lifecycle::{signals, Supervisor, SupervisorError};
use crate::net::{bind_all, PortProber};
use crate::observability::metrics;
use crate::routing::FieldSelector;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<AttributeResolver>,
    pub prober: PortProber,
}

/// The lookup service: one router shared by every listener.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
}

impl HttpServer {
    /// Create a server that resolves hostnames through the system resolver.
    pub fn new(config: Arc<AppConfig>) -> Self {
        let lookup = Arc::new(DnsLookup::from_system(config.timeouts.dns()));
        Self::with_lookup(config, lookup)
    }

    /// Create a server with a custom hostname lookup.
    pub fn with_lookup(config: Arc<AppConfig>, lookup: Arc<dyn HostnameLookup>) -> Self {
        let state = AppState {
            resolver: Arc::new(AttributeResolver::new(config.clone(), lookup)),
            prober: PortProber::default(),
        };
        let router = build_router(&config, state);
        Self { router, config }
    }

    /// The fully layered router, for serving on custom listeners.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Bind every configured listener and serve until one fails or a
    /// shutdown signal arrives.
    pub async fn run(self) -> Result<(), SupervisorError> {
        let listeners = bind_all(&self.config)
            .await
            .map_err(SupervisorError::Startup)?;

        let mut supervisor = Supervisor::new();
        for listener in listeners {
            supervisor.spawn(listener, self.router.clone());
        }

        tracing::info!(
            listeners = supervisor.len(),
            hostname = %self.config.hostname,
            "HTTP server started"
        );

        supervisor.run(signals::shutdown_signal()).await
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(config: &AppConfig, state: AppState) -> Router {
    Router::new()
        .route("/", get(lookup_handler))
        .route("/{field}", get(lookup_handler))
        .fallback(|| async { Rendered::not_found() })
        .with_state(state)
        .layer(middleware::from_fn(access_log))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.timeouts.request(),
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
}

/// Resolve the caller's attributes and answer the requested view.
async fn lookup_handler(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let (parts, _body) = request.into_parts();
    let selector = FieldSelector::parse(parts.uri.path());
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let attributes = match state
        .resolver
        .resolve(peer, &parts.method, &parts.headers, selector.name())
        .await
    {
        Ok(attributes) => attributes,
        Err(e) => {
            tracing::error!(error = %e, path = %parts.uri.path(), "Could not resolve request attributes");
            let rendered = Rendered::internal_error();
            metrics::record_request(selector.metric_label(), rendered.status.as_u16(), start);
            return rendered.into_response();
        }
    };

    let snapshot = RequestSnapshot::from_parts(&parts, peer);
    let rendered = render(&selector, &attributes, &snapshot, &state.prober).await;

    tracing::debug!(
        field = selector.name(),
        status = rendered.status.as_u16(),
        client = %attributes.ip,
        "Lookup answered"
    );
    metrics::record_request(selector.metric_label(), rendered.status.as_u16(), start);

    rendered.into_response()
}
