// HTTP surface: routing, handlers, shared state and server lifecycle

use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header::CONTENT_TYPE, Method, Uri},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use crate::{
    attractions::{build_attraction_list, AttractionItem, AttractionQuery},
    catalog::{Catalog, CatalogSource},
    error::{ApiError, DataError},
    rate_limit::{RateLimiter, UNKNOWN_CLIENT},
    recommend::{require_origin, Category, DestinationDetail, RecommendationItem, Recommender},
};

pub const SERVICE_NAME: &str = "travel-recommend";

#[derive(Debug)]
pub struct Limits {
    pub recommendations: RateLimiter,
    pub destinations: RateLimiter,
    pub cities: RateLimiter,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            recommendations: RateLimiter::per_minute(100),
            destinations: RateLimiter::per_minute(200),
            cities: RateLimiter::per_minute(50),
        }
    }
}

pub struct AppState {
    pub recommender: Recommender,
    pub limits: Limits,
    catalog: RwLock<Arc<Catalog>>,
    source: Arc<dyn CatalogSource>,
}

impl AppState {
    pub fn new(recommender: Recommender, source: Arc<dyn CatalogSource>, catalog: Catalog) -> Self {
        Self {
            recommender,
            limits: Limits::default(),
            catalog: RwLock::new(Arc::new(catalog)),
            source,
        }
    }

    pub async fn load(
        recommender: Recommender,
        source: Arc<dyn CatalogSource>,
    ) -> Result<Arc<Self>, DataError> {
        info!(source = %source.describe(), "Loading catalog...");
        let catalog = source.load().await?;
        Ok(Arc::new(Self::new(recommender, source, catalog)))
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    // Readers keep the snapshot they grabbed even if a reload lands mid-request
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.read().clone()
    }

    pub async fn reload(&self) -> Result<Arc<Catalog>, DataError> {
        let fresh = Arc::new(self.source.load().await?);
        *self.catalog.write() = Arc::clone(&fresh);
        Ok(fresh)
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: &'static str,
    pub data: T,
}

fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        code: 200,
        message: "success",
        data,
    })
}

fn client_ip(connect_info: Option<ConnectInfo<SocketAddr>>) -> std::net::IpAddr {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(UNKNOWN_CLIENT)
}

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub origin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationList {
    pub list: Vec<RecommendationItem>,
    pub total: usize,
}

pub async fn recommendations_handler(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Query(params): Query<RecommendationParams>,
) -> Result<Json<Envelope<RecommendationList>>, ApiError> {
    state.limits.recommendations.check(client_ip(connect_info))?;

    let category = Category::parse(params.kind.as_deref());
    let catalog = state.catalog();
    let list = state
        .recommender
        .build_list(&catalog.destinations, category, params.origin.as_deref());

    Ok(success(RecommendationList {
        total: list.len(),
        list,
    }))
}

#[derive(Debug, Deserialize)]
pub struct OriginParams {
    pub origin: Option<String>,
}

pub async fn destination_handler(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Path(raw_id): Path<String>,
    Query(params): Query<OriginParams>,
) -> Result<Json<Envelope<DestinationDetail>>, ApiError> {
    state.limits.destinations.check(client_ip(connect_info))?;

    let parsed_id = raw_id.parse::<i64>().ok();
    // Origin is checked before the id so clients learn about it first
    require_origin(parsed_id.unwrap_or_default(), params.origin.as_deref())?;

    let not_found = || ApiError::NotFound(format!("Destination {raw_id} not found"));
    let id = parsed_id.ok_or_else(not_found)?;

    let catalog = state.catalog();
    let dest = catalog.destination(id).ok_or_else(not_found)?;

    let detail = state
        .recommender
        .destination_detail(dest, params.origin.as_deref())
        .map_err(|err| {
            if err.is_fatal_for_entity() {
                error!(destination_id = id, %err, "destination detail failed");
            } else {
                warn!(destination_id = id, %err, "destination detail rejected");
            }
            err
        })?;

    Ok(success(detail))
}

#[derive(Debug, Serialize)]
pub struct CityView {
    pub id: usize,
    pub name: String,
    pub province: Option<String>,
}

pub async fn cities_handler(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Result<Json<Envelope<Vec<CityView>>>, ApiError> {
    state.limits.cities.check(client_ip(connect_info))?;

    let cities = state
        .recommender
        .links()
        .registry()
        .iter()
        .enumerate()
        .map(|(index, city)| CityView {
            id: index + 1,
            name: city.name.clone(),
            province: city.province.clone(),
        })
        .collect();

    Ok(success(cities))
}

#[derive(Debug, Deserialize)]
pub struct AttractionParams {
    pub city_name: Option<String>,
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub async fn attractions_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AttractionParams>,
) -> Json<Envelope<Vec<AttractionItem>>> {
    let query = AttractionQuery {
        city_name: params.city_name.as_deref(),
        city: params.city.as_deref(),
        kind: params.kind.as_deref(),
    };
    let catalog = state.catalog();
    success(build_attraction_list(
        &catalog.attractions,
        &query,
        state.recommender.links(),
    ))
}

#[derive(Debug, Serialize)]
pub struct ReloadSummary {
    pub destinations: usize,
    pub attractions: usize,
    pub reloaded_at: String,
}

pub async fn reload_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<ReloadSummary>>, ApiError> {
    let catalog = state.reload().await.map_err(|err| {
        error!(%err, "catalog reload failed, keeping previous snapshot");
        err
    })?;

    info!(
        destinations = catalog.destinations.len(),
        attractions = catalog.attractions.len(),
        "catalog reloaded"
    );
    Ok(success(ReloadSummary {
        destinations: catalog.destinations.len(),
        attractions: catalog.attractions.len(),
        reloaded_at: Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn health_handler() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn fallback_handler(uri: Uri) -> ApiError {
    warn!(path = %uri.path(), "unknown route");
    ApiError::UnknownRoute(uri.path().to_string())
}

pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/recommendations", get(recommendations_handler))
        .route("/api/destinations/:id", get(destination_handler))
        .route("/api/cities", get(cities_handler))
        .route("/api/attractions", get(attractions_handler))
        .route("/api/admin/reload", post(reload_handler))
        .route("/health", get(health_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// Forgets clients whose window has lapsed so the limiter maps stay bounded
fn spawn_limiter_sweep(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let now = Instant::now();
            let purged = state.limits.recommendations.purge_expired(now)
                + state.limits.destinations.purge_expired(now)
                + state.limits.cities.purge_expired(now);
            if purged > 0 {
                debug!(purged, "expired rate limit windows removed");
            }
        }
    });
}

pub async fn serve(state: Arc<AppState>, port: u16) -> std::io::Result<()> {
    spawn_limiter_sweep(Arc::clone(&state));
    let app = build_app(state);

    let address = format!("0.0.0.0:{port}");
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(%err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                error!(%err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::StaticSource, config::ProviderConfig, links::LinkGenerator,
        models::Destination, registry::CityRegistry,
    };

    fn state() -> AppState {
        let recommender = Recommender::new(LinkGenerator::new(
            Arc::new(CityRegistry::builtin()),
            ProviderConfig::default(),
        ));
        let dest = Destination {
            id: 1,
            name: "苏州".to_string(),
            city_name: Some("苏州".to_string()),
            ..Default::default()
        };
        let catalog = Catalog::new(vec![dest], vec![]);
        let source = Arc::new(StaticSource::new(catalog.clone()));
        AppState::new(recommender, source, catalog)
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let state = state();
        let before = state.catalog();
        let after = tokio_test::block_on(state.reload()).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.destinations.len(), 1);
        assert!(Arc::ptr_eq(&state.catalog(), &after));
    }

    #[test]
    fn test_unknown_client_shares_bucket() {
        assert_eq!(client_ip(None), UNKNOWN_CLIENT);
        let addr: SocketAddr = "192.168.1.9:4000".parse().unwrap();
        assert_eq!(client_ip(Some(ConnectInfo(addr))).to_string(), "192.168.1.9");
    }
}
