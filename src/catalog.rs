// Static destination/attraction catalog and the sources it is loaded from

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use crate::{
    error::DataError,
    models::{Attraction, Destination},
    registry::CityRegistry,
};

pub const DESTINATIONS_FILE: &str = "destinations.json";
pub const ATTRACTIONS_FILE: &str = "attractions.json";

// Immutable snapshot; replaced wholesale on reload
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub destinations: Vec<Destination>,
    pub attractions: Vec<Attraction>,
}

impl Catalog {
    pub fn new(destinations: Vec<Destination>, attractions: Vec<Attraction>) -> Self {
        let catalog = Self {
            destinations,
            attractions,
        };
        catalog.log_consistency();
        catalog
    }

    pub fn destination(&self, id: i64) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.id == id)
    }

    // Problems are reported, never fatal; a missing city_name is rejected per entity later
    fn log_consistency(&self) {
        for d in &self.destinations {
            let Some(city_name) = d.canonical_city() else {
                error!(destination_id = d.id, field = "city_name", "destination is missing city_name");
                continue;
            };
            if !d.name.is_empty() && d.name != city_name {
                warn!(destination_id = d.id, name = %d.name, city_name, "name differs from city_name");
            }
            if let Some(city) = d.city.as_deref().filter(|c| *c != city_name) {
                warn!(destination_id = d.id, city, city_name, "city differs from city_name");
            }
        }
    }

    pub fn validate(&self, registry: &CityRegistry) -> ValidationReport {
        let mut report = ValidationReport::default();
        let mut seen = HashSet::new();

        for (index, d) in self.destinations.iter().enumerate() {
            if d.id == 0 {
                report
                    .errors
                    .push(format!("record {} has no id", index + 1));
            } else if !seen.insert(d.id) {
                report.errors.push(format!("[id={}] duplicate id", d.id));
            }

            let Some(city_name) = d.canonical_city() else {
                report
                    .errors
                    .push(format!("[id={}] missing city_name (required for links)", d.id));
                continue;
            };

            if !d.name.is_empty() && d.name != city_name {
                report.warnings.push(format!(
                    "[id={}] name \"{}\" differs from city_name \"{}\"",
                    d.id, d.name, city_name
                ));
            }
            if let Some(city) = d.city.as_deref().filter(|c| *c != city_name) {
                report.warnings.push(format!(
                    "[id={}] city \"{}\" differs from city_name \"{}\"",
                    d.id, city, city_name
                ));
            }
            if !registry.contains(city_name) {
                report.warnings.push(format!(
                    "[id={}] city_name \"{}\" is not in the city registry",
                    d.id, city_name
                ));
            }
            if d.summary.trim().is_empty() {
                report.warnings.push(format!("[id={}] summary is empty", d.id));
            }
            if d.recommend_reasons.len() < 3 {
                report.warnings.push(format!(
                    "[id={}] only {} recommend reasons",
                    d.id,
                    d.recommend_reasons.len()
                ));
            }
            if d.itinerary.len() < 2 {
                report.warnings.push(format!(
                    "[id={}] itinerary covers {} day(s)",
                    d.id,
                    d.itinerary.len()
                ));
            }
        }

        report
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[async_trait]
pub trait CatalogSource: Send + Sync + 'static {
    async fn load(&self) -> Result<Catalog, DataError>;

    fn describe(&self) -> String;
}

// Reads <dir>/destinations.json and <dir>/attractions.json
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let display = path.display().to_string();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DataError::Io {
            path: display.clone(),
            source,
        })?;
    serde_json::from_str(&content).map_err(|source| DataError::Json {
        path: display,
        source,
    })
}

#[async_trait]
impl CatalogSource for JsonFileSource {
    async fn load(&self) -> Result<Catalog, DataError> {
        let destinations_path = self.dir.join(DESTINATIONS_FILE);
        let attractions_path = self.dir.join(ATTRACTIONS_FILE);

        let (destinations, attractions): (Vec<Destination>, Vec<Attraction>) = futures::try_join!(
            read_json::<Vec<Destination>>(&destinations_path),
            read_json::<Vec<Attraction>>(&attractions_path)
        )?;

        if destinations.is_empty() {
            return Err(DataError::Empty(destinations_path.display().to_string()));
        }

        info!(
            destinations = destinations.len(),
            attractions = attractions.len(),
            dir = %self.dir.display(),
            "catalog loaded"
        );
        Ok(Catalog::new(destinations, attractions))
    }

    fn describe(&self) -> String {
        format!("json files in {}", self.dir.display())
    }
}

// In-memory catalog, handy for tests and embedding
#[derive(Debug, Clone)]
pub struct StaticSource {
    catalog: Arc<Catalog>,
}

impl StaticSource {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

#[async_trait]
impl CatalogSource for StaticSource {
    async fn load(&self) -> Result<Catalog, DataError> {
        Ok(Catalog::clone(&self.catalog))
    }

    fn describe(&self) -> String {
        "static catalog".to_string()
    }
}
