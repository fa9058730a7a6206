// Outbound OTA link generation. Each provider identifier comes from an ordered
// chain of resolution strategies; the first that applies wins and the terminal
// step always yields a value. Only a missing city_name is fatal.

use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::{
    config::ProviderConfig,
    error::RecommendError,
    models::Destination,
    registry::{CityInfo, CityRegistry},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSet {
    pub hotel: String,
    pub transport: String,
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fliggy_hotel: Option<String>,
    // False when the package id is an approximation
    pub vacation_id_verified: bool,
}

// Where a resolved identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    // Taken from the registry entry for the city.
    Registry,
    // The destination's `city_name`, verbatim. Used when the city is not
    // in the registry; only URL specificity degrades.
    CityNameLiteral,
    // The destination's `city_name`, lowercased. Pinyin stand-in for
    // unregistered cities.
    CityNameLowercase,
    // The resolved hotel code standing in for a missing vacation id.
    // Unverified: the two id spaces differ for most cities.
    HotelCodeFallback,
    // The configured default origin code, for unregistered origins.
    DefaultOriginCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub source: Source,
}

impl Resolved {
    fn new(value: impl Into<String>, source: Source) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }
}

// Inputs shared by every resolution chain
#[derive(Debug, Clone, Copy)]
pub struct ResolutionInput<'a> {
    pub city_name: &'a str,
    pub dest: Option<&'a CityInfo>,
    pub origin: Option<&'a CityInfo>,
    pub default_origin_code: &'a str,
}

pub type Strategy = fn(&ResolutionInput<'_>) -> Option<Resolved>;
pub type Terminal = fn(&ResolutionInput<'_>) -> Resolved;

pub fn resolve(input: &ResolutionInput, chain: &[Strategy], terminal: Terminal) -> Resolved {
    chain
        .iter()
        .find_map(|strategy| strategy(input))
        .unwrap_or_else(|| terminal(input))
}

fn hotel_code_from_registry(input: &ResolutionInput) -> Option<Resolved> {
    input
        .dest
        .map(|info| Resolved::new(info.hotel_code.as_str(), Source::Registry))
}

fn hotel_code_from_city_name(input: &ResolutionInput) -> Resolved {
    Resolved::new(input.city_name, Source::CityNameLiteral)
}

fn origin_code_from_registry(input: &ResolutionInput) -> Option<Resolved> {
    input
        .origin
        .map(|info| Resolved::new(info.hotel_code.as_str(), Source::Registry))
}

fn origin_code_default(input: &ResolutionInput) -> Resolved {
    Resolved::new(input.default_origin_code, Source::DefaultOriginCode)
}

fn pinyin_from_registry(input: &ResolutionInput) -> Option<Resolved> {
    input
        .dest
        .map(|info| Resolved::new(info.pinyin.as_str(), Source::Registry))
}

fn pinyin_from_city_name(input: &ResolutionInput) -> Resolved {
    Resolved::new(input.city_name.to_lowercase(), Source::CityNameLowercase)
}

fn vacation_id_from_registry(input: &ResolutionInput) -> Option<Resolved> {
    input
        .dest
        .and_then(|info| info.vacation_destination_id.as_deref())
        .filter(|id| !id.is_empty())
        .map(|id| Resolved::new(id, Source::Registry))
}

fn vacation_id_from_hotel_code(input: &ResolutionInput) -> Resolved {
    let hotel = resolve(input, HOTEL_CODE_CHAIN, hotel_code_from_city_name);
    Resolved::new(hotel.value, Source::HotelCodeFallback)
}

pub const HOTEL_CODE_CHAIN: &[Strategy] = &[hotel_code_from_registry];
pub const ORIGIN_CODE_CHAIN: &[Strategy] = &[origin_code_from_registry];
pub const PINYIN_CHAIN: &[Strategy] = &[pinyin_from_registry];
pub const VACATION_ID_CHAIN: &[Strategy] = &[vacation_id_from_registry];

// All identifiers resolved for one (destination, origin) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityResolution {
    pub city_name: String,
    pub origin: String,
    pub hotel_code: Resolved,
    pub origin_code: Resolved,
    pub pinyin: Resolved,
    pub vacation_id: Resolved,
    pub dest_verified: bool,
}

impl CityResolution {
    pub fn vacation_id_verified(&self) -> bool {
        self.dest_verified && self.vacation_id.source == Source::Registry
    }
}

#[derive(Debug, Clone)]
pub struct LinkGenerator {
    registry: Arc<CityRegistry>,
    config: ProviderConfig,
}

impl LinkGenerator {
    pub fn new(registry: Arc<CityRegistry>, config: ProviderConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &CityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    // Resolves the destination and origin cities. Fails only when the
    // destination has no canonical `city_name`.
    pub fn resolve_cities(
        &self,
        destination: &Destination,
        origin: Option<&str>,
    ) -> Result<CityResolution, RecommendError> {
        let city_name = destination.canonical_city().ok_or_else(|| {
            error!(
                destination_id = destination.id,
                field = "city_name",
                "destination has no city_name, refusing to build links"
            );
            RecommendError::DataIntegrity {
                destination_id: destination.id,
                field: "city_name",
            }
        })?;

        let origin = match origin.filter(|o| !o.trim().is_empty()) {
            Some(origin) => origin,
            None => {
                debug!(
                    destination_id = destination.id,
                    default_origin = %self.config.default_origin,
                    "no origin supplied, using default"
                );
                self.config.default_origin.as_str()
            }
        };

        let input = ResolutionInput {
            city_name,
            dest: self.registry.lookup(city_name),
            origin: self.registry.lookup(origin),
            default_origin_code: &self.config.default_origin_code,
        };

        if input.dest.is_none() {
            let miss = RecommendError::RegistryMiss {
                city: city_name.to_string(),
            };
            warn!(destination_id = destination.id, %miss, "falling back to literal city values");
        }
        if input.origin.is_none() {
            let miss = RecommendError::RegistryMiss {
                city: origin.to_string(),
            };
            warn!(destination_id = destination.id, %miss, "falling back to default origin code");
        }

        let resolution = CityResolution {
            city_name: city_name.to_string(),
            origin: origin.to_string(),
            hotel_code: resolve(&input, HOTEL_CODE_CHAIN, hotel_code_from_city_name),
            origin_code: resolve(&input, ORIGIN_CODE_CHAIN, origin_code_default),
            pinyin: resolve(&input, PINYIN_CHAIN, pinyin_from_city_name),
            vacation_id: resolve(&input, VACATION_ID_CHAIN, vacation_id_from_hotel_code),
            dest_verified: input.dest.map_or(false, |info| info.verified),
        };

        if !resolution.vacation_id_verified() {
            warn!(
                destination_id = destination.id,
                city_name = %resolution.city_name,
                vacation_id = %resolution.vacation_id.value,
                source = ?resolution.vacation_id.source,
                "vacation destination id is unverified"
            );
        }

        Ok(resolution)
    }

    // Builds the hotel, transport and package links for a destination as
    // seen from `origin` (the configured default origin when absent).
    pub fn generate(
        &self,
        destination: &Destination,
        origin: Option<&str>,
    ) -> Result<LinkSet, RecommendError> {
        let resolution = self.resolve_cities(destination, origin)?;
        debug!(
            destination_id = destination.id,
            city_name = %resolution.city_name,
            origin = %resolution.origin,
            hotel_code = %resolution.hotel_code.value,
            "generating OTA links"
        );
        Ok(self.compose(&resolution))
    }

    fn affiliate_params(&self) -> [(&'static str, &str); 3] {
        [
            ("AllianceID", self.config.alliance_id.as_str()),
            ("sid", self.config.ota_pid.as_str()),
            ("ouid", self.config.ouid.as_str()),
        ]
    }

    // `segment` is appended as one encoded path segment, so '/', '?' and '#' stay inside it
    fn build_url(&self, base: &str, segment: Option<&str>, params: &[(&str, &str)]) -> String {
        let affiliate = self.affiliate_params();
        let mut url = match Url::parse(base) {
            Ok(url) => url,
            Err(e) => {
                // Base URLs come from static config; keep serving with the raw base
                error!(base, error = %e, "invalid provider base URL");
                return base.to_string();
            }
        };

        if let Some(segment) = segment {
            match url.path_segments_mut() {
                Ok(mut path) => {
                    path.pop_if_empty().push(segment);
                }
                Err(()) => {
                    error!(base, "provider base URL cannot take a path");
                    return base.to_string();
                }
            }
        }

        url.query_pairs_mut()
            .extend_pairs(params.iter().copied())
            .extend_pairs(affiliate.iter().copied());
        url.into()
    }

    pub fn compose(&self, resolution: &CityResolution) -> LinkSet {
        let city = resolution.city_name.as_str();

        let hotel = self.build_url(
            &self.config.hotel_base_url,
            None,
            &[("city", resolution.hotel_code.value.as_str())],
        );

        let transport = self.build_url(
            &self.config.transport_base_url,
            None,
            &[
                ("ticketType", "0"),
                ("dStation", resolution.origin.as_str()),
                ("aStation", city),
            ],
        );

        let package_slug = format!(
            "d-{}-{}.html",
            resolution.pinyin.value, resolution.vacation_id.value
        );
        let package = self.build_url(
            &self.config.package_base_url,
            Some(&package_slug),
            &[
                ("sv", city),
                ("st", city),
                ("from", "do"),
                ("startcity", resolution.origin_code.value.as_str()),
            ],
        );

        let fliggy_hotel = self.config.fliggy_pid.as_deref().map(|pid| {
            match Url::parse_with_params(
                &self.config.fliggy_hotel_base_url,
                &[("city", city), ("pid", pid)],
            ) {
                Ok(url) => url.into(),
                Err(e) => {
                    error!(error = %e, "invalid secondary provider base URL");
                    self.config.fliggy_hotel_base_url.clone()
                }
            }
        });

        LinkSet {
            hotel,
            transport,
            package,
            fliggy_hotel,
            vacation_id_verified: resolution.vacation_id_verified(),
        }
    }

    // Ticket page for a single attraction.
    pub fn attraction_ticket_url(&self, attraction_id: i64) -> String {
        let page = format!("t{attraction_id}.html");
        self.build_url(&self.config.ticket_base_url, Some(&page), &[])
    }
}
