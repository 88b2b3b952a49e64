use crate::models::{
    ListingDetail, ListingSummary, Location, Owner, TechnicalSheet, LISTING_BASE_URL,
    NOT_AVAILABLE, NO_DESCRIPTION, NO_TITLE,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Raw `listing` objects of every hit in a search response.
/// Hits without `_source.listing` are skipped.
pub fn listings(data: &Value) -> Vec<&Value> {
    let Some(hits) = data.pointer("/hits/hits").and_then(Value::as_array) else {
        debug!("Response has no hits.hits array");
        return Vec::new();
    };

    hits.iter()
        .filter_map(|hit| {
            let listing = hit.pointer("/_source/listing");
            if listing.is_none() {
                warn!("Skipping hit without _source.listing");
            }
            listing
        })
        .collect()
}

/// Flatten one page of search results into summary rows,
/// each paired with the raw listing it came from
pub fn flatten_search_page(data: &Value) -> Vec<(ListingSummary, &Value)> {
    listings(data)
        .into_iter()
        .filter_map(|raw| summarize_listing(raw).map(|row| (row, raw)))
        .collect()
}

/// Flatten a detail response. Only the first hit is used.
pub fn flatten_detail(data: &Value) -> Option<(ListingDetail, &Value)> {
    let raw = listings(data).into_iter().next()?;
    detail_listing(raw).map(|detail| (detail, raw))
}

/// Reduced record for one listing; `None` when it carries no id
pub fn summarize_listing(listing: &Value) -> Option<ListingSummary> {
    let id = listing_id(listing)?;

    Some(ListingSummary {
        id,
        title: text_or(listing, "title", NO_TITLE),
        description: text_or(listing, "description", NO_DESCRIPTION),
        address: text_or(listing, "address", NOT_AVAILABLE),
        location: location(listing),
        price: price_amount(listing),
        currency: price_currency(listing),
        bedrooms: count(listing, "bedrooms"),
        bathrooms: count(listing, "bathrooms"),
        garages: count(listing, "garage"),
        area_m2: number(listing, "m2").unwrap_or(0.0),
        images: images(listing),
        url: listing_url(listing),
    })
}

/// Full record for one listing; `None` when it carries no id
pub fn detail_listing(listing: &Value) -> Option<ListingDetail> {
    let id = listing_id(listing)?;
    let locations = listing.get("locations");
    let owner = listing.get("owner").filter(|o| !o.is_null());

    Some(ListingDetail {
        id,
        title: text_or(listing, "title", NO_TITLE),
        description: text_or(listing, "description", NO_DESCRIPTION),
        address: text_or(listing, "address", NOT_AVAILABLE),
        location: location(listing),
        zone: first_location_name(locations, "zone"),
        commune: first_location_name(locations, "commune"),
        price: price_amount(listing),
        currency: price_currency(listing),
        sheet: technical_sheet(listing),
        bedrooms: count(listing, "bedrooms"),
        bathrooms: count(listing, "bathrooms"),
        stratum: text_or(listing, "stratum", NOT_AVAILABLE),
        floors_count: optional_text(listing, "floorsCount"),
        floor: optional_text(listing, "floor"),
        garages: count(listing, "garage"),
        common_expenses: listing
            .get("commonExpenses")
            .and_then(|expenses| number(expenses, "amount")),
        images: images(listing),
        url: listing_url(listing),
        owner: owner
            .map(|o| Owner {
                name: text_or(o, "name", NOT_AVAILABLE),
                phone: text_or(o, "masked_phone", NOT_AVAILABLE),
                kind: text_or(o, "type", NOT_AVAILABLE),
                address: text_or(o, "address", NOT_AVAILABLE),
            })
            .unwrap_or_default(),
        published_at: text_or(listing, "created_at", NOT_AVAILABLE),
        updated_at: text_or(listing, "updated_at", NOT_AVAILABLE),
        facilities: names(listing.get("facilities")),
        video: text_or(listing, "youtube", NOT_AVAILABLE),
        social_links: social_links(listing),
    })
}

/// Attribute stored in the technical sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetField {
    PropertyType,
    Condition,
    BuiltArea,
    PrivateArea,
    Age,
}

impl SheetField {
    /// Index of the attribute in a sheet without field names
    pub fn position(self) -> usize {
        match self {
            SheetField::PropertyType => 1,
            SheetField::Condition => 2,
            SheetField::BuiltArea => 4,
            SheetField::PrivateArea => 5,
            SheetField::Age => 6,
        }
    }

    /// `field` key of the attribute in a named sheet
    pub fn name(self) -> &'static str {
        match self {
            SheetField::PropertyType => "property_type",
            SheetField::Condition => "property_state",
            SheetField::BuiltArea => "built_area",
            SheetField::PrivateArea => "private_area",
            SheetField::Age => "construction_age",
        }
    }
}

fn technical_sheet(listing: &Value) -> TechnicalSheet {
    let sheet = listing
        .get("technicalSheet")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    TechnicalSheet {
        property_type: sheet_value(sheet, SheetField::PropertyType),
        condition: sheet_value(sheet, SheetField::Condition),
        built_area_m2: sheet_value(sheet, SheetField::BuiltArea),
        private_area_m2: sheet_value(sheet, SheetField::PrivateArea),
        age: sheet_value(sheet, SheetField::Age),
    }
}

/// Look up a sheet attribute by `field` name when the entries carry one,
/// otherwise by fixed position.
pub fn sheet_value(sheet: &[Value], field: SheetField) -> String {
    let named = sheet.iter().any(|entry| entry.get("field").is_some());

    let entry = if named {
        sheet
            .iter()
            .find(|entry| entry.get("field").and_then(Value::as_str) == Some(field.name()))
    } else {
        sheet.get(field.position())
    };

    entry
        .and_then(|entry| entry.get("value"))
        .filter(|value| !value.is_null())
        .map(render_scalar)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn listing_id(listing: &Value) -> Option<String> {
    match listing.get("id") {
        Some(id) if !id.is_null() => Some(render_scalar(id)),
        _ => {
            warn!("Skipping listing without id");
            None
        }
    }
}

fn location(listing: &Value) -> Location {
    let locations = listing.get("locations");
    Location {
        city: first_location_name(locations, "city"),
        state: first_location_name(locations, "state"),
        neighbourhood: first_location_name(locations, "neighbourhood"),
        latitude: number(listing, "latitude"),
        longitude: number(listing, "longitude"),
    }
}

/// Name of the first entry of `locations[key]`, or the sentinel
fn first_location_name(locations: Option<&Value>, key: &str) -> String {
    locations
        .and_then(|l| l.get(key))
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .and_then(|entry| entry.get("name"))
        .filter(|name| !name.is_null())
        .map(render_scalar)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn price_amount(listing: &Value) -> Option<f64> {
    listing.get("price").and_then(|price| number(price, "amount"))
}

fn price_currency(listing: &Value) -> String {
    listing
        .pointer("/price/currency/name")
        .filter(|name| !name.is_null())
        .map(render_scalar)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn images(listing: &Value) -> Vec<String> {
    listing
        .get("images")
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(|img| img.get("image"))
                .filter(|url| !url.is_null())
                .map(render_scalar)
                .collect()
        })
        .unwrap_or_default()
}

fn listing_url(listing: &Value) -> String {
    let link = listing
        .get("link")
        .filter(|link| !link.is_null())
        .map(render_scalar)
        .unwrap_or_default();
    format!("{}{}", LISTING_BASE_URL, link)
}

fn names(entries: Option<&Value>) -> Vec<String> {
    entries
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("name"))
                .map(render_scalar)
                .collect()
        })
        .unwrap_or_default()
}

fn social_links(listing: &Value) -> BTreeMap<String, String> {
    listing
        .get("socialMediaLinks")
        .and_then(Value::as_array)
        .map(|links| {
            links
                .iter()
                .filter_map(|link| {
                    let name = link.get("name")?;
                    let url = link.get("url")?;
                    Some((render_scalar(name), render_scalar(url)))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Text value of `key`, or `default` when absent or null
fn text_or(value: &Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .filter(|v| !v.is_null())
        .map(render_scalar)
        .unwrap_or_else(|| default.to_string())
}

fn optional_text(value: &Value, key: &str) -> Option<String> {
    value.get(key).filter(|v| !v.is_null()).map(render_scalar)
}

fn number(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Room and garage counts: an absent key is 0, an explicit null stays null
fn count(value: &Value, key: &str) -> Option<i64> {
    match value.get(key) {
        None => Some(0),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    }
}

/// Strings without quotes, everything else as compact JSON
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries(data: &Value) -> Vec<ListingSummary> {
        flatten_search_page(data).into_iter().map(|(row, _)| row).collect()
    }

    fn detail(data: &Value) -> Option<ListingDetail> {
        flatten_detail(data).map(|(detail, _)| detail)
    }
    use serde_json::json;

    fn hit(listing: Value) -> Value {
        json!({ "_source": { "listing": listing } })
    }

    fn page(listings: Vec<Value>) -> Value {
        json!({ "hits": { "hits": listings.into_iter().map(hit).collect::<Vec<_>>() } })
    }

    fn full_listing() -> Value {
        json!({
            "id": 7364521,
            "title": "Apartamento en arriendo en El Poblado",
            "description": "Amplio y con vista",
            "address": "Cra 43A # 1-50",
            "locations": {
                "city": [{ "name": "Medellín" }],
                "state": [{ "name": "Antioquia" }],
                "neighbourhood": [{ "name": "El Poblado" }],
                "zone": [{ "name": "Sur" }],
                "commune": [{ "name": "Comuna 14" }]
            },
            "latitude": 6.2087,
            "longitude": -75.5671,
            "price": { "amount": 3200000, "currency": { "name": "COP" } },
            "bedrooms": 3,
            "bathrooms": 2,
            "garage": 1,
            "m2": 95.5,
            "stratum": 6,
            "floorsCount": 12,
            "floor": 7,
            "commonExpenses": { "amount": 450000 },
            "images": [{ "image": "https://img/1.jpg" }, { "alt": "no image" }, { "image": "https://img/2.jpg" }],
            "link": "/apartamento-en-arriendo/7364521",
            "technicalSheet": [
                { "value": "7364521" },
                { "value": "Apartamento" },
                { "value": "Usado" },
                { "value": 3 },
                { "value": 95.5 },
                { "value": 90 },
                { "value": "9 a 15 años" }
            ],
            "owner": {
                "name": "Inmobiliaria Central",
                "masked_phone": "300***1234",
                "type": "inmobiliaria"
            },
            "created_at": "2024-11-02T10:00:00Z",
            "updated_at": "2025-01-15T08:30:00Z",
            "facilities": [{ "name": "Piscina" }, { "name": "Gimnasio" }],
            "socialMediaLinks": [
                { "name": "instagram", "url": "https://instagram.com/central" },
                { "name": "facebook", "url": "https://facebook.com/central" }
            ]
        })
    }

    #[test]
    fn test_search_page_yields_one_record_per_hit() {
        let data = page(vec![
            json!({ "id": 1, "locations": {} }),
            json!({ "id": "2", "locations": {} }),
            json!({ "id": 3, "locations": {} }),
        ]);

        let rows = summaries(&data);

        assert_eq!(rows.len(), 3);
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_summary_fields() {
        let rows = summaries(&page(vec![full_listing()]));
        let row = &rows[0];

        assert_eq!(row.id, "7364521");
        assert_eq!(row.title, "Apartamento en arriendo en El Poblado");
        assert_eq!(row.location.city, "Medellín");
        assert_eq!(row.location.state, "Antioquia");
        assert_eq!(row.location.neighbourhood, "El Poblado");
        assert_eq!(row.location.latitude, Some(6.2087));
        assert_eq!(row.price, Some(3_200_000.0));
        assert_eq!(row.currency, "COP");
        assert_eq!(row.bedrooms, Some(3));
        assert_eq!(row.bathrooms, Some(2));
        assert_eq!(row.garages, Some(1));
        assert_eq!(row.area_m2, 95.5);
        assert_eq!(row.images, vec!["https://img/1.jpg", "https://img/2.jpg"]);
        assert_eq!(
            row.url,
            "https://www.fincaraiz.com.co/apartamento-en-arriendo/7364521"
        );
    }

    #[test]
    fn test_absent_city_degrades_to_sentinel() {
        let data = page(vec![json!({
            "id": 10,
            "locations": { "state": [{ "name": "Antioquia" }], "neighbourhood": [] }
        })]);

        let row = &summaries(&data)[0];

        assert_eq!(row.location.city, NOT_AVAILABLE);
        assert_eq!(row.location.state, "Antioquia");
        assert_eq!(row.location.neighbourhood, NOT_AVAILABLE);
    }

    #[test]
    fn test_sparse_listing_uses_defaults() {
        let row = &summaries(&page(vec![json!({ "id": 11 })]))[0];

        assert_eq!(row.title, NO_TITLE);
        assert_eq!(row.description, NO_DESCRIPTION);
        assert_eq!(row.address, NOT_AVAILABLE);
        assert_eq!(row.location.city, NOT_AVAILABLE);
        assert_eq!(row.price, None);
        assert_eq!(row.currency, NOT_AVAILABLE);
        assert_eq!(row.bedrooms, Some(0));
        assert_eq!(row.area_m2, 0.0);
        assert!(row.images.is_empty());
        assert_eq!(row.url, LISTING_BASE_URL);
    }

    #[test]
    fn test_null_counts_stay_empty() {
        let row = &summaries(&page(vec![json!({
            "id": 12,
            "bedrooms": null,
            "bathrooms": "2",
        })]))[0];

        assert_eq!(row.bedrooms, None);
        assert_eq!(row.bathrooms, Some(2));
        assert_eq!(row.garages, Some(0));
    }

    #[test]
    fn test_hits_without_id_or_listing_are_skipped() {
        let data = json!({ "hits": { "hits": [
            { "_source": { "listing": { "id": 1 } } },
            { "_source": { "listing": { "title": "sin id" } } },
            { "_source": {} }
        ] } });

        let rows = summaries(&data);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "1");
    }

    #[test]
    fn test_rows_keep_their_raw_listing() {
        let data = page(vec![json!({ "id": 1, "title": "a" }), json!({ "title": "sin id" }), json!({ "id": 3 })]);

        let pairs = flatten_search_page(&data);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].1["title"], "a");
        assert_eq!(pairs[1].1["id"], 3);
        assert_eq!(flatten_detail(&data).unwrap().1["title"], "a");
    }

    #[test]
    fn test_missing_hits_yields_nothing() {
        assert!(summaries(&json!({})).is_empty());
        assert!(summaries(&json!({ "hits": {} })).is_empty());
        assert!(summaries(&page(vec![])).is_empty());
        assert!(detail(&page(vec![])).is_none());
    }

    #[test]
    fn test_detail_fields() {
        let detail = detail(&page(vec![full_listing(), json!({ "id": 2 })]))
            .expect("detail should be extracted");

        assert_eq!(detail.id, "7364521");
        assert_eq!(detail.location.state, "Antioquia");
        assert_eq!(detail.zone, "Sur");
        assert_eq!(detail.commune, "Comuna 14");
        assert_eq!(detail.sheet.property_type, "Apartamento");
        assert_eq!(detail.sheet.condition, "Usado");
        assert_eq!(detail.sheet.built_area_m2, "95.5");
        assert_eq!(detail.sheet.private_area_m2, "90");
        assert_eq!(detail.sheet.age, "9 a 15 años");
        assert_eq!(detail.stratum, "6");
        assert_eq!(detail.floors_count.as_deref(), Some("12"));
        assert_eq!(detail.floor.as_deref(), Some("7"));
        assert_eq!(detail.common_expenses, Some(450_000.0));
        assert_eq!(detail.owner.name, "Inmobiliaria Central");
        assert_eq!(detail.owner.phone, "300***1234");
        assert_eq!(detail.owner.kind, "inmobiliaria");
        assert_eq!(detail.owner.address, NOT_AVAILABLE);
        assert_eq!(detail.published_at, "2024-11-02T10:00:00Z");
        assert_eq!(detail.facilities, vec!["Piscina", "Gimnasio"]);
        assert_eq!(detail.video, NOT_AVAILABLE);
        assert_eq!(
            detail.social_links.get("instagram").map(String::as_str),
            Some("https://instagram.com/central")
        );
    }

    #[test]
    fn test_detail_without_owner_or_sheet() {
        let detail = detail(&page(vec![json!({ "id": 5 })])).unwrap();

        assert_eq!(detail.owner, Owner::default());
        assert_eq!(detail.sheet.property_type, NOT_AVAILABLE);
        assert_eq!(detail.sheet.age, NOT_AVAILABLE);
        assert_eq!(detail.stratum, NOT_AVAILABLE);
        assert_eq!(detail.floors_count, None);
        assert_eq!(detail.common_expenses, None);
        assert!(detail.social_links.is_empty());
    }

    #[test]
    fn test_positional_sheet_is_order_sensitive() {
        let mut listing = full_listing();
        let sheet = listing["technicalSheet"].as_array_mut().unwrap();
        sheet.swap(1, 2);

        let detail = detail(&page(vec![listing])).unwrap();

        // Swapping entries swaps what each column means
        assert_eq!(detail.sheet.property_type, "Usado");
        assert_eq!(detail.sheet.condition, "Apartamento");
    }

    #[test]
    fn test_named_sheet_ignores_order() {
        let sheet = vec![
            json!({ "field": "construction_age", "value": "1 a 8 años" }),
            json!({ "field": "property_state", "value": "Nuevo" }),
            json!({ "field": "property_type", "value": "Casa" }),
            json!({ "field": "built_area", "value": 140 }),
        ];

        assert_eq!(sheet_value(&sheet, SheetField::PropertyType), "Casa");
        assert_eq!(sheet_value(&sheet, SheetField::Condition), "Nuevo");
        assert_eq!(sheet_value(&sheet, SheetField::BuiltArea), "140");
        assert_eq!(sheet_value(&sheet, SheetField::Age), "1 a 8 años");
        assert_eq!(sheet_value(&sheet, SheetField::PrivateArea), NOT_AVAILABLE);
    }

    #[test]
    fn test_short_positional_sheet_degrades() {
        let sheet = vec![json!({ "value": "x" }), json!({ "value": "Apartamento" })];

        assert_eq!(sheet_value(&sheet, SheetField::PropertyType), "Apartamento");
        assert_eq!(sheet_value(&sheet, SheetField::Age), NOT_AVAILABLE);
    }
}
