// Data structures for the static destination and attraction datasets

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Transport {
    #[serde(default)]
    pub high_speed_rail: bool,
    #[serde(default)]
    pub rail_time: Option<String>,
    #[serde(default)]
    pub airport: bool,
}

impl Transport {
    pub fn describe(&self) -> String {
        if self.high_speed_rail {
            match &self.rail_time {
                Some(time) => format!("高铁直达 · {time}"),
                None => "高铁直达".to_string(),
            }
        } else if self.airport {
            "飞机直达".to_string()
        } else {
            "交通便利".to_string()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TrustSignals {
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub click_count_7d: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Destination {
    pub id: i64,
    pub name: String,
    // Canonical city used for every outbound link; validated per entity
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub budget_range: String,
    #[serde(default)]
    pub weekend_suitable: bool,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub trust_signals: TrustSignals,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub recommend_reasons: Vec<String>,
    #[serde(default)]
    pub itinerary: Vec<String>,
}

impl Destination {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    // Blank strings count as missing
    pub fn canonical_city(&self) -> Option<&str> {
        self.city_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AttractionSignals {
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub click_count_7d: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Attraction {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price_hint: String,
    #[serde(default)]
    pub primary_reason: String,
    #[serde(default)]
    pub suitable_days: String,
    #[serde(default)]
    pub transport: String,
    #[serde(default)]
    pub photo_friendly: bool,
    #[serde(default)]
    pub trust_signals: AttractionSignals,
}

impl Attraction {
    pub fn city_key(&self) -> &str {
        self.city_name
            .as_deref()
            .or(self.city.as_deref())
            .unwrap_or_default()
    }
}
