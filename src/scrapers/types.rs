use crate::models::City;
use serde::Serialize;
use serde_json::Value;

/// Listings requested per search page
pub const DEFAULT_ROWS: u32 = 20;
/// Rows requested when fetching a single listing by id
pub const DETAIL_ROWS: u32 = 100;
/// Upper bound on pages fetched per city
pub const MAX_PAGES: u32 = 500;

const SOURCE: u32 = 10;

/// JSON request body sent to the search endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Payload<P> {
    pub variables: Variables<P>,
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Variables<P> {
    pub rows: u32,
    pub params: P,
    pub page: u32,
    pub source: u32,
}

pub type SearchPayload = Payload<SearchParams>;
pub type DetailPayload = Payload<DetailParams>;

/// Filters for a paged city search
#[derive(Debug, Clone, Serialize)]
pub struct SearchParams {
    pub page: u32,
    /// Sort order
    pub order: u32,
    /// 2 = rent
    pub operation_type_id: u32,
    /// Apartments, houses, studios, lofts and rooms
    pub property_type_id: Vec<u32>,
    /// The API expects the string, not a boolean
    pub projects: String,
    #[serde(rename = "currencyID")]
    pub currency_id: u32,
    #[serde(rename = "m2Currency")]
    pub m2_currency: u32,
    pub locations: Vec<LocationFilter>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            page: 1,
            order: 2,
            operation_type_id: 2,
            property_type_id: vec![1, 2, 14, 15, 16],
            projects: "false".to_string(),
            currency_id: 4,
            m2_currency: 4,
            locations: Vec::new(),
        }
    }
}

/// Single-listing lookup
#[derive(Debug, Clone, Serialize)]
pub struct DetailParams {
    /// Numeric ids are sent as JSON numbers, anything else as a string
    pub id: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationFilter {
    pub country: Vec<Place>,
    pub name: String,
    pub location_point: LocationPoint,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub slug: Vec<String>,
    pub estate: Place,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationPoint {
    pub coordinates: [f64; 2],
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Place {
    pub name: String,
    pub id: String,
    pub slug: String,
}

impl LocationFilter {
    /// Location block for a city. Country, slug and estate are fixed to
    /// Colombia / Antioquia whatever the city.
    pub fn for_city(city: &City) -> Self {
        Self {
            country: vec![Place {
                name: "Colombia".to_string(),
                id: "858656c1-bbb1-4b0d-b569-f61bbdebc8f0".to_string(),
                slug: "country-48-colombia".to_string(),
            }],
            name: city.name.to_string(),
            location_point: LocationPoint {
                coordinates: city.coordinates,
                kind: "point".to_string(),
            },
            id: city.id.to_string(),
            kind: "CITY".to_string(),
            slug: vec!["city-colombia-05-001".to_string()],
            estate: Place {
                name: "Antioquia".to_string(),
                id: "2d63ee80-421b-488f-992a-0e07a3264c3e".to_string(),
                slug: "state-colombia-05-antioquia".to_string(),
            },
        }
    }
}

impl SearchPayload {
    /// Payload for one page of rentals in `city`
    pub fn for_city(city: &City, page: u32, rows: u32) -> Self {
        Self {
            variables: Variables {
                rows,
                params: SearchParams {
                    page,
                    locations: vec![LocationFilter::for_city(city)],
                    ..SearchParams::default()
                },
                page,
                source: SOURCE,
            },
            query: String::new(),
        }
    }
}

impl DetailPayload {
    /// Payload that fetches the full record of one listing
    pub fn for_listing(id: &str) -> Self {
        Self {
            variables: Variables {
                rows: DETAIL_ROWS,
                params: DetailParams {
                    id: id
                        .parse::<u64>()
                        .map(Value::from)
                        .unwrap_or_else(|_| Value::from(id)),
                },
                page: 1,
                source: SOURCE,
            },
            query: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cities;
    use serde_json::json;

    #[test]
    fn test_search_payload_shape() {
        let city = cities::find("Sabaneta").unwrap();
        let payload = serde_json::to_value(SearchPayload::for_city(city, 3, DEFAULT_ROWS)).unwrap();

        assert_eq!(payload["query"], "");
        assert_eq!(payload["variables"]["rows"], 20);
        assert_eq!(payload["variables"]["page"], 3);
        assert_eq!(payload["variables"]["source"], 10);

        let params = &payload["variables"]["params"];
        assert_eq!(params["page"], 3);
        assert_eq!(params["order"], 2);
        assert_eq!(params["operation_type_id"], 2);
        assert_eq!(params["property_type_id"], json!([1, 2, 14, 15, 16]));
        assert_eq!(params["projects"], "false");
        assert_eq!(params["currencyID"], 4);
        assert_eq!(params["m2Currency"], 4);

        let location = &params["locations"][0];
        assert_eq!(location["name"], "Sabaneta");
        assert_eq!(location["id"], "241a17ef-3aa0-485c-93aa-689fc2f2d114");
        assert_eq!(location["type"], "CITY");
        assert_eq!(location["location_point"]["type"], "point");
        assert_eq!(
            location["location_point"]["coordinates"],
            json!([-75.615552, 6.150848])
        );
        assert_eq!(location["estate"]["name"], "Antioquia");
        assert_eq!(location["country"][0]["slug"], "country-48-colombia");
    }

    #[test]
    fn test_detail_payload_shape() {
        let payload = serde_json::to_value(DetailPayload::for_listing("10293847")).unwrap();
        assert_eq!(
            payload,
            json!({
                "variables": {"rows": 100, "params": {"id": 10293847}, "page": 1, "source": 10},
                "query": ""
            })
        );
    }

    #[test]
    fn test_detail_payload_keeps_non_numeric_id() {
        let payload = serde_json::to_value(DetailPayload::for_listing("abc-12")).unwrap();
        assert_eq!(payload["variables"]["params"]["id"], "abc-12");
    }
}
