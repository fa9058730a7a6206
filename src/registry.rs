// City registry: canonical city name -> OTA identifiers and coordinate
//
// Hotel codes and vacation destination ids are separate identifier spaces.
// A city may have no vacation id at all; that is `None`, never a zero.

use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::DataError, models::Coordinate};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CityInfo {
    pub name: String,
    pub pinyin: String,
    pub hotel_code: String,
    #[serde(default)]
    pub vacation_destination_id: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    #[serde(default)]
    pub province: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CityRegistry {
    cities: Vec<CityInfo>,
    index: HashMap<String, usize>,
}

impl CityRegistry {
    // Later duplicates replace earlier ones but keep the first position
    pub fn new(cities: Vec<CityInfo>) -> Self {
        let mut registry = Self::default();
        for city in cities {
            match registry.index.get(&city.name) {
                Some(&pos) => registry.cities[pos] = city,
                None => {
                    registry.index.insert(city.name.clone(), registry.cities.len());
                    registry.cities.push(city);
                }
            }
        }
        registry
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let cities: Vec<CityInfo> = serde_json::from_str(json)?;
        Ok(Self::new(cities))
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: display.clone(),
            source,
        })?;
        let registry = Self::from_json(&content).map_err(|source| DataError::Json {
            path: display.clone(),
            source,
        })?;
        if registry.is_empty() {
            return Err(DataError::Empty(display));
        }
        Ok(registry)
    }

    // Exact match only: no case folding, no trimming
    pub fn lookup(&self, city_name: &str) -> Option<&CityInfo> {
        self.index.get(city_name).map(|&pos| &self.cities[pos])
    }

    pub fn coordinate_of(&self, city_name: &str) -> Option<Coordinate> {
        self.lookup(city_name).and_then(|info| info.coordinate)
    }

    pub fn contains(&self, city_name: &str) -> bool {
        self.index.contains_key(city_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CityInfo> {
        self.cities.iter()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_CITIES
                .iter()
                .map(|c| CityInfo {
                    name: c.name.to_string(),
                    pinyin: c.pinyin.to_string(),
                    hotel_code: c.hotel_code.to_string(),
                    vacation_destination_id: c.vacation_id.map(str::to_string),
                    verified: c.verified,
                    coordinate: Some(Coordinate::new(c.lat, c.lng)),
                    province: Some(c.province.to_string()),
                })
                .collect(),
        )
    }
}

struct BuiltinCity {
    name: &'static str,
    pinyin: &'static str,
    hotel_code: &'static str,
    vacation_id: Option<&'static str>,
    verified: bool,
    lat: f64,
    lng: f64,
    province: &'static str,
}

const fn city(
    name: &'static str,
    pinyin: &'static str,
    hotel_code: &'static str,
    vacation_id: Option<&'static str>,
    verified: bool,
    (lat, lng): (f64, f64),
    province: &'static str,
) -> BuiltinCity {
    BuiltinCity {
        name,
        pinyin,
        hotel_code,
        vacation_id,
        verified,
        lat,
        lng,
        province,
    }
}

// Listing order is the order served by /api/cities
const BUILTIN_CITIES: &[BuiltinCity] = &[
    city("北京", "beijing", "1", Some("1"), true, (39.9042, 116.4074), "北京"),
    city("上海", "shanghai", "2", Some("2"), true, (31.2304, 121.4737), "上海"),
    city("广州", "guangzhou", "32", Some("32"), true, (23.1291, 113.2644), "广东"),
    city("深圳", "shenzhen", "30", Some("26"), true, (22.5431, 114.0579), "广东"),
    city("杭州", "hangzhou", "17", Some("14"), true, (30.2741, 120.1551), "浙江"),
    city("南京", "nanjing", "12", Some("9"), true, (32.0603, 118.7969), "江苏"),
    city("苏州", "suzhou", "14", Some("11"), true, (31.2989, 120.5853), "江苏"),
    city("成都", "chengdu", "28", Some("104"), true, (30.6624, 104.0633), "四川"),
    city("重庆", "chongqing", "4", Some("4"), true, (29.5630, 106.5516), "重庆"),
    city("西安", "xian", "10", None, false, (34.3416, 108.9398), "陕西"),
    city("武汉", "wuhan", "477", Some("145"), true, (30.5928, 114.3055), "湖北"),
    city("长沙", "changsha", "148", Some("148"), true, (28.2278, 112.9388), "湖南"),
    city("厦门", "xiamen", "25", Some("21"), true, (24.4798, 118.0819), "福建"),
    city("青岛", "qingdao", "7", Some("5"), true, (36.0671, 120.3826), "山东"),
    city("天津", "tianjin", "3", Some("3"), true, (39.3434, 117.3616), "天津"),
    city("大连", "dalian", "19", None, false, (38.9140, 121.6147), "辽宁"),
    city("昆明", "kunming", "22", None, false, (25.0389, 102.7183), "云南"),
    city("桂林", "guilin", "33", None, false, (25.2342, 110.1992), "广西"),
    // Shares Guangzhou's vacation id; pending confirmation
    city("丽江", "lijiang", "37", Some("32"), false, (26.8550, 100.2277), "云南"),
    city("三亚", "sanya", "43", Some("61"), true, (18.2528, 109.5119), "海南"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_is_exact() {
        let registry = CityRegistry::builtin();
        assert_eq!(registry.len(), 20);

        let suzhou = registry.lookup("苏州").unwrap();
        assert_eq!(suzhou.hotel_code, "14");
        assert_eq!(suzhou.vacation_destination_id.as_deref(), Some("11"));
        assert_eq!(suzhou.pinyin, "suzhou");

        assert!(registry.lookup("苏州 ").is_none());
        assert!(registry.lookup("Suzhou").is_none());
    }

    #[test]
    fn test_missing_vacation_id_is_none_not_zero() {
        let registry = CityRegistry::builtin();
        let xian = registry.lookup("西安").unwrap();
        assert_eq!(xian.vacation_destination_id, None);
        assert!(!xian.verified);
        assert_eq!(xian.hotel_code, "10");
    }

    #[test]
    fn test_hotel_and_vacation_ids_are_independent() {
        let registry = CityRegistry::builtin();
        let qingdao = registry.lookup("青岛").unwrap();
        assert_eq!(qingdao.hotel_code, "7");
        assert_eq!(qingdao.vacation_destination_id.as_deref(), Some("5"));
    }

    #[test]
    fn test_registry_from_json_keeps_order_and_replaces_duplicates() {
        let json = r#"[
            {"name": "Beijing", "pinyin": "beijing", "hotel_code": "1", "vacation_destination_id": "1", "verified": true},
            {"name": "Xi'an", "pinyin": "xian", "hotel_code": "10"},
            {"name": "Beijing", "pinyin": "beijing", "hotel_code": "100", "verified": true}
        ]"#;
        let registry = CityRegistry::from_json(json).unwrap();
        let names: Vec<_> = registry.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Beijing", "Xi'an"]);
        assert_eq!(registry.lookup("Beijing").unwrap().hotel_code, "100");
        assert_eq!(registry.lookup("Xi'an").unwrap().vacation_destination_id, None);
        assert_eq!(registry.coordinate_of("Xi'an"), None);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = CityRegistry::load_from_file("does/not/exist.json").unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
