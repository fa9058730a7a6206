// Attraction listing: city filter, popularity filter, per-city cap

use std::collections::HashMap;

use serde::Serialize;

use crate::{links::LinkGenerator, models::Attraction};

pub const MAX_PER_CITY: usize = 5;
pub const POPULAR_CLICK_THRESHOLD: u64 = 500;

#[derive(Debug, Clone, Default)]
pub struct AttractionQuery<'a> {
    pub city_name: Option<&'a str>,
    pub city: Option<&'a str>,
    // None behaves like "popular"
    pub kind: Option<&'a str>,
}

impl AttractionQuery<'_> {
    fn popular_only(&self) -> bool {
        matches!(self.kind, None | Some("popular") | Some("student"))
    }

    fn matches_city(&self, attraction: &Attraction) -> bool {
        if let Some(city_name) = self.city_name.filter(|c| !c.is_empty()) {
            attraction.city_name.as_deref() == Some(city_name)
        } else if let Some(city) = self.city.filter(|c| !c.is_empty()) {
            attraction.city.as_deref() == Some(city) || attraction.city_name.as_deref() == Some(city)
        } else {
            true
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttractionSignalsView {
    pub view_count_7d: u64,
    pub click_count_7d: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttractionItem {
    pub id: i64,
    pub city: String,
    pub name: String,
    pub category: String,
    pub ticket_available: bool,
    pub price_hint: String,
    pub primary_reason: String,
    pub suitable_days: String,
    pub transport: String,
    pub photo_friendly: bool,
    pub trust_signals: AttractionSignalsView,
    pub cta_text: &'static str,
    pub cta_link: String,
}

fn is_popular(attraction: &Attraction) -> bool {
    attraction.trust_signals.is_popular
        || attraction.trust_signals.click_count_7d > POPULAR_CLICK_THRESHOLD
}

pub fn select_attractions<'a>(
    attractions: &'a [Attraction],
    query: &AttractionQuery,
) -> Vec<&'a Attraction> {
    let mut filtered: Vec<&Attraction> = attractions
        .iter()
        .filter(|a| query.matches_city(a))
        .filter(|a| !query.popular_only() || is_popular(a))
        .collect();

    filtered.sort_by(|a, b| {
        b.trust_signals
            .click_count_7d
            .cmp(&a.trust_signals.click_count_7d)
    });

    // Group by city in first-seen order, capped per city
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Attraction>> = HashMap::new();
    for attraction in filtered {
        let key = attraction.city_key();
        let group = groups.entry(key).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        if group.len() < MAX_PER_CITY {
            group.push(attraction);
        }
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(key))
        .flatten()
        .collect()
}

pub fn sanitize_price_hint(text: &str) -> String {
    text.replace("学生优惠", "官方优惠")
        .replace("学生票", "官方")
        .replace("学生", "官方")
        .replace("免费", "官方价格")
}

pub fn sanitize_attraction_reason(text: &str) -> String {
    text.replace("学生必去", "热门景点")
        .replace("学生优惠", "官方优惠")
        .replace("学生票", "官方")
        .replace("学生", "官方")
}

pub fn build_attraction_list(
    attractions: &[Attraction],
    query: &AttractionQuery,
    links: &LinkGenerator,
) -> Vec<AttractionItem> {
    select_attractions(attractions, query)
        .into_iter()
        .map(|a| AttractionItem {
            id: a.id,
            city: a.city_key().to_string(),
            name: a.name.clone(),
            category: a.category.clone(),
            ticket_available: true,
            price_hint: sanitize_price_hint(&a.price_hint),
            primary_reason: sanitize_attraction_reason(&a.primary_reason),
            suitable_days: a.suitable_days.clone(),
            transport: a.transport.clone(),
            photo_friendly: a.photo_friendly,
            trust_signals: AttractionSignalsView {
                view_count_7d: a.trust_signals.click_count_7d,
                click_count_7d: a.trust_signals.click_count_7d,
            },
            cta_text: "寻找酒店",
            cta_link: links.attraction_ticket_url(a.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ProviderConfig, models::AttractionSignals, registry::CityRegistry};
    use std::sync::Arc;

    fn attraction(id: i64, city: &str, popular: bool, clicks: u64) -> Attraction {
        Attraction {
            id,
            name: format!("景点{id}"),
            city_name: Some(city.to_string()),
            trust_signals: AttractionSignals {
                is_popular: popular,
                click_count_7d: clicks,
            },
            ..Default::default()
        }
    }

    fn ids(selected: &[&Attraction]) -> Vec<i64> {
        selected.iter().map(|a| a.id).collect()
    }

    #[test]
    fn test_popular_filter_uses_flag_or_threshold() {
        let data = vec![
            attraction(1, "苏州", true, 10),
            attraction(2, "苏州", false, 501),
            attraction(3, "苏州", false, 500),
        ];
        let selected = select_attractions(&data, &AttractionQuery::default());
        assert_eq!(ids(&selected), vec![2, 1]);

        let all = AttractionQuery {
            kind: Some("all"),
            ..Default::default()
        };
        assert_eq!(ids(&select_attractions(&data, &all)), vec![2, 3, 1]);
    }

    #[test]
    fn test_city_filters() {
        let mut legacy = attraction(3, "", true, 0);
        legacy.city_name = None;
        legacy.city = Some("杭州".to_string());
        let data = vec![attraction(1, "苏州", true, 5), attraction(2, "杭州", true, 9), legacy];

        let by_name = AttractionQuery {
            city_name: Some("杭州"),
            ..Default::default()
        };
        assert_eq!(ids(&select_attractions(&data, &by_name)), vec![2]);

        let by_city = AttractionQuery {
            city: Some("杭州"),
            ..Default::default()
        };
        assert_eq!(ids(&select_attractions(&data, &by_city)), vec![2, 3]);
    }

    #[test]
    fn test_cap_per_city_keeps_city_order() {
        let mut data: Vec<_> = (1..=7).map(|i| attraction(i, "苏州", true, 100 - i as u64)).collect();
        data.push(attraction(20, "杭州", true, 1000));
        data.push(attraction(21, "杭州", true, 1));

        let selected = select_attractions(&data, &AttractionQuery::default());
        assert_eq!(ids(&selected), vec![20, 21, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_items_are_sanitized_and_linked() {
        let mut a = attraction(88, "苏州", true, 0);
        a.price_hint = "学生票半价".to_string();
        a.primary_reason = "学生必去".to_string();
        let links = LinkGenerator::new(Arc::new(CityRegistry::builtin()), ProviderConfig::default());

        let items = build_attraction_list(&[a], &AttractionQuery::default(), &links);
        assert_eq!(items[0].price_hint, "官方半价");
        assert_eq!(items[0].primary_reason, "热门景点");
        assert_eq!(items[0].city, "苏州");
        assert!(items[0].cta_link.contains("/t88.html?"));
        assert!(items[0].ticket_available);
    }
}
