// Travel destination recommendation service: city registry, distances,
// affiliate link generation and recommendation assembly

pub mod api;
pub mod attractions;
pub mod catalog;
pub mod config;
pub mod distance;
pub mod error;
pub mod links;
pub mod models;
pub mod rate_limit;
pub mod recommend;
pub mod registry;

// Re-export key types for convenience
pub use api::{build_app, serve, AppState};
pub use catalog::{Catalog, CatalogSource, JsonFileSource, StaticSource, ValidationReport};
pub use config::{Config, ProviderConfig};
pub use distance::{distance_from_city, distance_km, haversine_km};
pub use error::{ApiError, ConfigError, DataError, RecommendError};
pub use links::{LinkGenerator, LinkSet};
pub use models::{Attraction, Coordinate, Destination};
pub use recommend::{Category, RecommendationItem, Recommender};
pub use registry::{CityInfo, CityRegistry};
