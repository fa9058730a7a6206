// Recommendation list and destination detail assembly

use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
    distance::distance_from_city,
    error::RecommendError,
    links::{LinkGenerator, LinkSet},
    models::{Destination, TrustSignals},
};

pub const MAX_RESULTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Weekend,
    Monthly,
    Popular,
    // Unrecognised categories include everything, like Monthly
    PassThrough,
}

impl Category {
    // A missing category means the weekend list
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => Category::Weekend,
            Some("week") | Some("weekend") => Category::Weekend,
            Some("month") | Some("monthly") => Category::Monthly,
            Some("popular") => Category::Popular,
            Some(_) => Category::PassThrough,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Category::Weekend => "周末推荐",
            Category::Monthly => "本月推荐",
            Category::Popular => "热门推荐",
            Category::PassThrough => "推荐",
        }
    }

    pub fn includes(&self, destination: &Destination) -> bool {
        match self {
            Category::Weekend => destination.weekend_suitable,
            Category::Monthly | Category::PassThrough => true,
            Category::Popular => destination.trust_signals.is_popular,
        }
    }

    // Filter, order and truncate; `sort_by` is stable so equal counts keep input order
    pub fn select<'a>(&self, destinations: &'a [Destination]) -> Vec<&'a Destination> {
        let mut selected: Vec<&Destination> =
            destinations.iter().filter(|d| self.includes(d)).collect();

        if *self == Category::Popular {
            selected.sort_by(|a, b| {
                b.trust_signals
                    .click_count_7d
                    .cmp(&a.trust_signals.click_count_7d)
            });
        }

        selected.truncate(MAX_RESULTS);
        selected
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSignals {
    pub view_count_7d: u64,
    pub click_count_7d: u64,
    pub is_popular: bool,
}

impl From<&TrustSignals> for ItemSignals {
    fn from(signals: &TrustSignals) -> Self {
        Self {
            view_count_7d: signals.click_count_7d,
            click_count_7d: signals.click_count_7d,
            is_popular: signals.is_popular,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationItem {
    pub id: i64,
    pub name: String,
    pub tag: &'static str,
    pub budget_range: String,
    pub primary_reason: String,
    pub distance: Option<u32>,
    pub transport: String,
    pub suitable_days: &'static str,
    pub trust_signals: ItemSignals,
    pub cover_image: Option<String>,
    pub cta_text: &'static str,
    pub cta_links: LinkSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationDetail {
    pub id: i64,
    pub name: String,
    pub summary: String,
    pub recommend_reasons: Vec<String>,
    pub itinerary: Vec<String>,
    pub budget_range: String,
    pub cover_image: Option<String>,
    pub trust_signals: TrustSignals,
    pub cta_links: LinkSet,
}

pub struct Recommender {
    links: LinkGenerator,
}

impl Recommender {
    pub fn new(links: LinkGenerator) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &LinkGenerator {
        &self.links
    }

    pub fn build_list(
        &self,
        destinations: &[Destination],
        category: Category,
        origin: Option<&str>,
    ) -> Vec<RecommendationItem> {
        let origin = origin.filter(|o| !o.trim().is_empty());
        let selected = category.select(destinations);
        debug!(
            ?category,
            origin = origin.unwrap_or_default(),
            selected = selected.len(),
            "building recommendation list"
        );

        selected
            .into_iter()
            .filter_map(|dest| match self.build_item(dest, category, origin) {
                Ok(item) => Some(item),
                // Registry misses and missing coordinates degrade inside build_item;
                // only integrity failures reach here
                Err(err) => {
                    error!(
                        destination_id = dest.id,
                        origin = origin.unwrap_or_default(),
                        %err,
                        "dropping destination from recommendation list"
                    );
                    None
                }
            })
            .collect()
    }

    fn build_item(
        &self,
        dest: &Destination,
        category: Category,
        origin: Option<&str>,
    ) -> Result<RecommendationItem, RecommendError> {
        let cta_links = self.links.generate(dest, origin)?;

        let distance = origin.and_then(|origin| {
            distance_from_city(self.links.registry(), origin, dest.coordinate())
                .map_err(|err| debug!(destination_id = dest.id, %err, "distance omitted"))
                .ok()
        });

        Ok(RecommendationItem {
            id: dest.id,
            name: dest.name.clone(),
            tag: category.tag(),
            budget_range: dest.budget_range.clone(),
            primary_reason: format!("预算{}内可成行", dest.budget_range),
            distance,
            transport: dest.transport.describe(),
            suitable_days: if dest.weekend_suitable { "1-2天" } else { "3-4天" },
            trust_signals: ItemSignals::from(&dest.trust_signals),
            cover_image: dest.cover_image.clone(),
            cta_text: "寻找酒店",
            cta_links,
        })
    }

    // The origin is mandatory here: a guessed origin would build a purchase link
    // for the wrong route
    pub fn destination_detail(
        &self,
        dest: &Destination,
        origin: Option<&str>,
    ) -> Result<DestinationDetail, RecommendError> {
        let origin = require_origin(dest.id, origin)?;
        let cta_links = self.links.generate(dest, Some(origin))?;

        Ok(DestinationDetail {
            id: dest.id,
            name: dest.name.clone(),
            summary: dest.summary.clone(),
            recommend_reasons: dest
                .recommend_reasons
                .iter()
                .map(|r| sanitize_reason(r))
                .collect(),
            itinerary: dest.itinerary.clone(),
            budget_range: dest.budget_range.clone(),
            cover_image: dest.cover_image.clone(),
            trust_signals: dest.trust_signals.clone(),
            cta_links,
        })
    }
}

pub fn require_origin(destination_id: i64, origin: Option<&str>) -> Result<&str, RecommendError> {
    origin.filter(|o| !o.trim().is_empty()).ok_or_else(|| {
        info!(destination_id, "detail requested without origin");
        RecommendError::MissingOriginParameter { destination_id }
    })
}

// Student-targeted wording is no longer shown; order matters
pub fn sanitize_reason(reason: &str) -> String {
    reason
        .replace("学生友好", "安全可靠")
        .replace("学生票多", "门票丰富")
        .replace("学生", "")
}
