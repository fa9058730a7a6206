use std::{net::SocketAddr, sync::Arc};

use serde_json::Value;
use tokio::net::TcpListener;

use travel_recommend::{
    api::{build_app, AppState, Limits},
    catalog::{Catalog, StaticSource},
    config::ProviderConfig,
    links::LinkGenerator,
    models::{Attraction, AttractionSignals, Destination, TrustSignals},
    rate_limit::RateLimiter,
    recommend::Recommender,
    registry::CityRegistry,
};

fn destination(id: i64, city: Option<&str>, weekend: bool, clicks: u64, at: (f64, f64)) -> Destination {
    Destination {
        id,
        name: city.unwrap_or("无名").to_string(),
        city_name: city.map(str::to_string),
        latitude: at.0,
        longitude: at.1,
        budget_range: "500-800".to_string(),
        weekend_suitable: weekend,
        trust_signals: TrustSignals {
            is_popular: true,
            click_count_7d: clicks,
        },
        summary: "周末好去处".to_string(),
        recommend_reasons: vec!["学生友好".to_string(), "美食多".to_string()],
        itinerary: vec!["第一天".to_string(), "第二天".to_string()],
        ..Default::default()
    }
}

fn fixture() -> Catalog {
    let attraction = |id: i64, city: &str, clicks: u64| Attraction {
        id,
        name: format!("景点{id}"),
        city_name: Some(city.to_string()),
        trust_signals: AttractionSignals {
            is_popular: false,
            click_count_7d: clicks,
        },
        ..Default::default()
    };

    Catalog::new(
        vec![
            destination(1, Some("苏州"), true, 300, (31.2989, 120.5853)),
            destination(2, Some("杭州"), true, 900, (30.2741, 120.1551)),
            destination(3, Some("成都"), false, 300, (30.6624, 104.0633)),
            destination(4, None, true, 50, (30.0, 120.0)),
        ],
        vec![
            attraction(101, "苏州", 800),
            attraction(102, "苏州", 20),
            attraction(201, "杭州", 2000),
        ],
    )
}

fn state(limits: Limits) -> AppState {
    let recommender = Recommender::new(LinkGenerator::new(
        Arc::new(CityRegistry::builtin()),
        ProviderConfig::default(),
    ));
    let catalog = fixture();
    let source = Arc::new(StaticSource::new(catalog.clone()));
    AppState::new(recommender, source, catalog).with_limits(limits)
}

async fn spawn(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_app(Arc::new(state));
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{addr}")
}

async fn get(base: &str, path: &str, query: &[(&str, &str)]) -> (u16, Value) {
    let response = reqwest::Client::new()
        .get(format!("{base}{path}"))
        .query(query)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_weekend_list_without_origin_has_no_distances() {
    let base = spawn(state(Limits::default())).await;
    let (status, body) = get(&base, "/api/recommendations", &[]).await;

    assert_eq!(status, 200);
    assert_eq!(body["code"], 200);
    assert_eq!(body["message"], "success");
    let list = body["data"]["list"].as_array().unwrap();
    // Destination 4 has no city_name and is dropped
    let ids: Vec<_> = list.iter().map(|i| i["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(body["data"]["total"], 2);
    assert!(list.iter().all(|i| i["distance"].is_null()));
    assert!(list.iter().all(|i| i["tag"] == "周末推荐"));
}

#[tokio::test]
async fn test_popular_list_with_origin() {
    let base = spawn(state(Limits::default())).await;
    let (status, body) =
        get(&base, "/api/recommendations", &[("type", "popular"), ("origin", "北京")]).await;

    assert_eq!(status, 200);
    let list = body["data"]["list"].as_array().unwrap();
    let ids: Vec<_> = list.iter().map(|i| i["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![2, 1, 3]);

    let suzhou = &list[1];
    let distance = suzhou["distance"].as_u64().unwrap();
    assert!((1023..=1033).contains(&distance), "distance {distance}");
    let transport = suzhou["cta_links"]["transport"].as_str().unwrap();
    assert!(transport.contains("dStation=%E5%8C%97%E4%BA%AC"));
    assert!(transport.contains("aStation=%E8%8B%8F%E5%B7%9E"));
    assert!(suzhou["cta_links"]["hotel"]
        .as_str()
        .unwrap()
        .contains("city=14"));
    assert!(suzhou["cta_links"]["package"]
        .as_str()
        .unwrap()
        .contains("/d-suzhou-11.html?"));
}

#[tokio::test]
async fn test_unknown_category_passes_through() {
    let base = spawn(state(Limits::default())).await;
    let (_, body) = get(&base, "/api/recommendations", &[("type", "student_favorite")]).await;
    let list = body["data"]["list"].as_array().unwrap();
    assert_eq!(list.len(), 3);
    assert!(list.iter().all(|i| i["tag"] == "推荐"));
}

#[tokio::test]
async fn test_destination_detail_requires_origin() {
    let base = spawn(state(Limits::default())).await;

    let (status, body) = get(&base, "/api/destinations/1", &[]).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], 400);
    assert!(body["error"].is_string());

    let (status, _) = get(&base, "/api/destinations/1", &[("origin", "")]).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_destination_detail_statuses() {
    let base = spawn(state(Limits::default())).await;

    let (status, body) = get(&base, "/api/destinations/1", &[("origin", "上海")]).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["id"], 1);
    assert_eq!(body["data"]["recommend_reasons"][0], "安全可靠");
    assert!(body["data"]["cta_links"]["transport"]
        .as_str()
        .unwrap()
        .contains("dStation=%E4%B8%8A%E6%B5%B7"));

    let (status, _) = get(&base, "/api/destinations/999", &[("origin", "北京")]).await;
    assert_eq!(status, 404);

    let (status, _) = get(&base, "/api/destinations/abc", &[("origin", "北京")]).await;
    assert_eq!(status, 404);

    let (status, body) = get(&base, "/api/destinations/4", &[("origin", "北京")]).await;
    assert_eq!(status, 500);
    assert_eq!(body["code"], 500);
}

#[tokio::test]
async fn test_cities_follow_registry_order() {
    let base = spawn(state(Limits::default())).await;
    let (status, body) = get(&base, "/api/cities", &[]).await;

    assert_eq!(status, 200);
    let cities = body["data"].as_array().unwrap();
    assert_eq!(cities.len(), CityRegistry::builtin().len());
    assert_eq!(cities[0]["id"], 1);
    assert_eq!(cities[0]["name"], "北京");
    assert_eq!(cities[6]["name"], "苏州");
    assert_eq!(cities[6]["province"], "江苏");
}

#[tokio::test]
async fn test_attractions_capped_and_linked() {
    let base = spawn(state(Limits::default())).await;

    let (_, body) = get(&base, "/api/attractions", &[]).await;
    let ids: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![201, 101]);

    let (_, body) = get(&base, "/api/attractions", &[("city_name", "苏州"), ("type", "all")]).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items[0]["cta_link"]
        .as_str()
        .unwrap()
        .contains("/t101.html?"));
}

#[tokio::test]
async fn test_rate_limit_returns_retry_after() {
    let limits = Limits {
        cities: RateLimiter::per_minute(2),
        ..Limits::default()
    };
    let base = spawn(state(limits)).await;

    for _ in 0..2 {
        let (status, _) = get(&base, "/api/cities", &[]).await;
        assert_eq!(status, 200);
    }
    let (status, body) = get(&base, "/api/cities", &[]).await;
    assert_eq!(status, 429);
    assert!(body["retry_after"].as_u64().unwrap() >= 1);

    // Other endpoints have their own budget
    let (status, _) = get(&base, "/api/recommendations", &[]).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_health_reload_and_fallback() {
    let base = spawn(state(Limits::default())).await;

    let (status, body) = get(&base, "/health", &[]).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "travel-recommend");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].is_string());

    let response = reqwest::Client::new()
        .post(format!("{base}/api/admin/reload"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["destinations"], 4);
    assert_eq!(body["data"]["attractions"], 3);

    let (status, body) = get(&base, "/api/nowhere", &[]).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], 404);
    assert_eq!(body["path"], "/api/nowhere");
    assert!(body["message"].as_str().unwrap().contains("/api/nowhere"));
}
